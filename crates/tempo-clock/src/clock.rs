use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use crate::channel::{TickSlot, Ticks};
use crate::error::Error;
use crate::real::RealTimer;
use crate::timer::{Delivery, Ticker, Timer};
use crate::Timestamp;

/// A function reporting the current time as integer nanoseconds.
pub type NanotimeFn = Arc<dyn Fn() -> i64 + Send + Sync>;

/// A function reporting the current wall time.
pub type TimeFn = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// The clock capability set: tell time, create timers and tickers, sleep.
///
/// Every concrete clock — [`MonotonicClock`], [`WallClock`], and
/// [`FakeClock`](crate::FakeClock) — satisfies this contract, so code that
/// accepts an `Arc<dyn Clock>` can be driven by real time in production and
/// by a manually-advanced fake in tests.
///
/// All durations are signed nanoseconds and may be non-positive. Timers
/// treat a non-positive duration as "already due"; tickers treat it as a
/// programmer error and panic.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time in nanoseconds.
    fn now_ns(&self) -> i64;

    /// Returns the current time as a [`Timestamp`].
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.now_ns())
    }

    /// Returns the nanoseconds elapsed since `ns`. Negative if `ns` is in
    /// the future.
    fn since_ns(&self, ns: i64) -> i64 {
        self.now_ns().saturating_sub(ns)
    }

    /// Returns the nanoseconds elapsed since `t`.
    fn since(&self, t: Timestamp) -> i64 {
        self.since_ns(t.as_nanos())
    }

    /// Creates a one-shot timer that delivers the current time on its
    /// channel once `d_ns` has elapsed. Any duration is accepted; a
    /// non-positive one means the timer is already due.
    fn new_timer(&self, d_ns: i64) -> Timer;

    /// Like [`Clock::new_timer`], but invokes `f` instead of delivering on
    /// a channel. The callback runs on its own thread of execution, never
    /// inside the clock's bookkeeping.
    fn after_func(&self, d_ns: i64, f: Box<dyn Fn() + Send + Sync>) -> Timer;

    /// Creates a ticker that delivers the current time every `d_ns`.
    ///
    /// # Panics
    ///
    /// Panics if `d_ns <= 0`.
    fn new_ticker(&self, d_ns: i64) -> Ticker;

    /// Convenience: the notification channel of a new one-shot timer. The
    /// underlying timer cannot be stopped; it stays registered until it
    /// fires.
    fn after(&self, d_ns: i64) -> Ticks {
        self.new_timer(d_ns)
            .ticks()
            .expect("new_timer always delivers on a channel")
    }

    /// Convenience: the tick channel of a new ticker. The underlying ticker
    /// cannot be stopped. Panics if `d_ns <= 0`, like [`Clock::new_ticker`].
    fn tick(&self, d_ns: i64) -> Ticks {
        self.new_ticker(d_ns).ticks()
    }

    /// Blocks the calling thread until `d_ns` has elapsed as measured by
    /// this clock. The real clocks return immediately for non-positive
    /// durations; a fake clock blocks until its cursor reaches the deadline
    /// (see [`FakeClock::sleep`](crate::FakeClock)).
    fn sleep(&self, d_ns: i64);
}

fn default_monotonic_nanotime() -> i64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = *EPOCH.get_or_init(Instant::now);
    i64::try_from(epoch.elapsed().as_nanos()).unwrap_or(i64::MAX)
}

fn default_wall_time() -> Timestamp {
    Timestamp::from_system_time(std::time::SystemTime::now())
}

fn real_sleep(d_ns: i64) {
    if d_ns > 0 {
        thread::sleep(Duration::from_nanos(d_ns as u64));
    }
}

/// A clock backed by the host's monotonic time facility.
///
/// `now_ns` reports nanoseconds elapsed since a process-global epoch taken
/// on first use, so values start near zero and never go backwards.
#[derive(Clone)]
pub struct MonotonicClock {
    now_fn: NanotimeFn,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            now_fn: Arc::new(default_monotonic_nanotime),
        }
    }

    /// Creates a monotonic clock that tells time via `f`.
    pub fn with_nanotime_fn(f: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            now_fn: Arc::new(f),
        }
    }

    pub(crate) fn nanotime_fn(&self) -> NanotimeFn {
        Arc::clone(&self.now_fn)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> i64 {
        (self.now_fn)()
    }

    fn new_timer(&self, d_ns: i64) -> Timer {
        Timer::from_real(RealTimer::spawn(
            self.nanotime_fn(),
            d_ns,
            None,
            Delivery::Channel(TickSlot::new()),
        ))
    }

    fn after_func(&self, d_ns: i64, f: Box<dyn Fn() + Send + Sync>) -> Timer {
        Timer::from_real(RealTimer::spawn(
            self.nanotime_fn(),
            d_ns,
            None,
            Delivery::Func(Arc::from(f)),
        ))
    }

    fn new_ticker(&self, d_ns: i64) -> Ticker {
        assert!(d_ns > 0, "non-positive interval for new_ticker");
        Ticker::from_timer(Timer::from_real(RealTimer::spawn(
            self.nanotime_fn(),
            d_ns,
            Some(d_ns),
            Delivery::Channel(TickSlot::new()),
        )))
    }

    fn sleep(&self, d_ns: i64) {
        real_sleep(d_ns);
    }
}

/// A clock backed by the host's wall/calendar time facility.
///
/// `now_ns` reports nanoseconds relative to the Unix epoch and may jump
/// backwards if the system clock is adjusted.
#[derive(Clone)]
pub struct WallClock {
    time_fn: TimeFn,
    now_fn: NanotimeFn,
}

impl WallClock {
    pub fn new() -> Self {
        Self::with_time_fn(default_wall_time)
    }

    /// Creates a wall clock that tells time via `f`.
    pub fn with_time_fn(f: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        let time_fn: TimeFn = Arc::new(f);
        let now_fn = {
            let time_fn = Arc::clone(&time_fn);
            Arc::new(move || time_fn().as_nanos()) as NanotimeFn
        };
        Self { time_fn, now_fn }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now_ns(&self) -> i64 {
        (self.now_fn)()
    }

    fn now(&self) -> Timestamp {
        (self.time_fn)()
    }

    fn new_timer(&self, d_ns: i64) -> Timer {
        Timer::from_real(RealTimer::spawn(
            Arc::clone(&self.now_fn),
            d_ns,
            None,
            Delivery::Channel(TickSlot::new()),
        ))
    }

    fn after_func(&self, d_ns: i64, f: Box<dyn Fn() + Send + Sync>) -> Timer {
        Timer::from_real(RealTimer::spawn(
            Arc::clone(&self.now_fn),
            d_ns,
            None,
            Delivery::Func(Arc::from(f)),
        ))
    }

    fn new_ticker(&self, d_ns: i64) -> Ticker {
        assert!(d_ns > 0, "non-positive interval for new_ticker");
        Ticker::from_timer(Timer::from_real(RealTimer::spawn(
            Arc::clone(&self.now_fn),
            d_ns,
            Some(d_ns),
            Delivery::Channel(TickSlot::new()),
        )))
    }

    fn sleep(&self, d_ns: i64) {
        real_sleep(d_ns);
    }
}

/// Builds a clock from an explicit time source.
///
/// Unlike the infallible [`MonotonicClock::new`] / [`WallClock::new`]
/// constructors, the builder requires a source: building without one is the
/// crate's recoverable construction error. Setting one source clears the
/// other; the last one set wins.
#[derive(Default)]
pub struct ClockBuilder {
    nanotime_fn: Option<NanotimeFn>,
    time_fn: Option<TimeFn>,
}

impl ClockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `f` as a monotonic nanosecond source.
    pub fn with_nanotime_fn(mut self, f: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.nanotime_fn = Some(Arc::new(f));
        self.time_fn = None;
        self
    }

    /// Uses `f` as a wall time source.
    pub fn with_time_fn(mut self, f: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.time_fn = Some(Arc::new(f));
        self.nanotime_fn = None;
        self
    }

    /// Builds the clock, or [`Error::NoTimeSource`] if no source was set.
    pub fn build(self) -> Result<Arc<dyn Clock>, Error> {
        if let Some(f) = self.nanotime_fn {
            Ok(Arc::new(MonotonicClock { now_fn: f }))
        } else if let Some(f) = self.time_fn {
            let now_fn = {
                let time_fn = Arc::clone(&f);
                Arc::new(move || time_fn().as_nanos()) as NanotimeFn
            };
            Ok(Arc::new(WallClock {
                time_fn: f,
                now_fn,
            }))
        } else {
            Err(Error::NoTimeSource)
        }
    }
}
