use std::fmt;
use std::sync::Arc;

use crate::channel::{TickSlot, Ticks};
use crate::fake::{FakeClock, FakeTimer};
use crate::real::RealTimer;

/// How a firing alarm reaches its consumer: either a capacity-1 tick channel
/// or a callback, never both.
#[derive(Clone)]
pub(crate) enum Delivery {
    Channel(Arc<TickSlot>),
    Func(Arc<dyn Fn() + Send + Sync>),
}

impl Delivery {
    pub(crate) fn ticks(&self) -> Option<Ticks> {
        match self {
            Delivery::Channel(slot) => Some(Ticks::new(Arc::clone(slot))),
            Delivery::Func(_) => None,
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Channel(_) => f.write_str("Delivery::Channel"),
            Delivery::Func(_) => f.write_str("Delivery::Func"),
        }
    }
}

/// A one-shot timer handle.
///
/// The variant — real (thread-backed) or fake (virtual-clock bookkeeping) —
/// is fixed by the clock that created the timer; callers use one type for
/// both. Dropping the handle does not stop the timer: a pending alarm still
/// fires.
#[derive(Debug)]
pub struct Timer {
    inner: TimerInner,
}

#[derive(Debug)]
pub(crate) enum TimerInner {
    Real(RealTimer),
    Fake {
        clock: FakeClock,
        record: Arc<FakeTimer>,
    },
}

impl Timer {
    pub(crate) fn from_real(timer: RealTimer) -> Self {
        Self {
            inner: TimerInner::Real(timer),
        }
    }

    pub(crate) fn from_fake(clock: FakeClock, record: Arc<FakeTimer>) -> Self {
        Self {
            inner: TimerInner::Fake { clock, record },
        }
    }

    /// Returns the timer's notification channel, or `None` for callback
    /// timers created with `after_func`.
    pub fn ticks(&self) -> Option<Ticks> {
        match &self.inner {
            TimerInner::Real(timer) => timer.ticks(),
            TimerInner::Fake { record, .. } => record.ticks(),
        }
    }

    /// Re-arms the timer to expire `d_ns` from now, reactivating it if it
    /// had already fired or been stopped. Returns whether the timer was
    /// still active when reset was called.
    pub fn reset(&self, d_ns: i64) -> bool {
        self.reset_inner(d_ns, false)
    }

    /// Stops the timer, preventing any future firing. Returns whether it
    /// was active; a second stop returns `false` and has no further effect.
    pub fn stop(&self) -> bool {
        match &self.inner {
            TimerInner::Real(timer) => timer.stop(),
            TimerInner::Fake { clock, record } => clock.stop_timer(record),
        }
    }

    pub(crate) fn reset_inner(&self, d_ns: i64, update_period: bool) -> bool {
        match &self.inner {
            TimerInner::Real(timer) => timer.reset(d_ns, update_period),
            // The fake path derives "ticker" from the record's stored
            // period, so update_period is implicit there.
            TimerInner::Fake { clock, record } => clock.reset_timer(record, d_ns),
        }
    }

    #[cfg(test)]
    pub(crate) fn fake_record(&self) -> Option<&Arc<FakeTimer>> {
        match &self.inner {
            TimerInner::Real(_) => None,
            TimerInner::Fake { record, .. } => Some(record),
        }
    }
}

/// A periodic ticker handle. Created by
/// [`Clock::new_ticker`](crate::Clock::new_ticker); delivers on its channel
/// every period until stopped.
#[derive(Debug)]
pub struct Ticker {
    timer: Timer,
}

impl Ticker {
    pub(crate) fn from_timer(timer: Timer) -> Self {
        Self { timer }
    }

    /// Returns the ticker's notification channel.
    pub fn ticks(&self) -> Ticks {
        self.timer
            .ticks()
            .expect("tickers always deliver on a channel")
    }

    /// Re-arms the ticker with a new period; the next tick arrives after the
    /// new period elapses.
    ///
    /// # Panics
    ///
    /// Panics if `d_ns <= 0`.
    pub fn reset(&self, d_ns: i64) {
        assert!(d_ns > 0, "non-positive interval for Ticker::reset");
        self.timer.reset_inner(d_ns, true);
    }

    /// Stops the ticker. No more ticks will be delivered; an undelivered
    /// tick already in the channel remains readable.
    pub fn stop(&self) {
        self.timer.stop();
    }
}
