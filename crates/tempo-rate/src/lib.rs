//! Records event counts and reports them as a rate over elapsed time.
//!
//! A [`Recorder`] accumulates counts against a [`Clock`]; [`Recorder::rate`]
//! snapshots "count over elapsed" and [`Rate::per`] rescales that to any
//! period. Backed by a [`FakeClock`](tempo_clock::FakeClock), rates are
//! exact in tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tempo_clock::{Clock, MonotonicClock};

/// Nanoseconds in one second, the most common [`Rate::per`] period.
pub const SECOND_NS: i64 = 1_000_000_000;

/// Accumulates a running count and reports its rate over elapsed time.
///
/// [`Recorder::add`] is a single atomic add, cheap enough for hot paths;
/// snapshots and resets are equally lock-free.
pub struct Recorder {
    clock: Arc<dyn Clock>,
    count: AtomicI64,
    start_ns: AtomicI64,
}

impl Recorder {
    /// Creates a recorder measuring against the system's monotonic clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    /// Creates a recorder measuring against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let start_ns = AtomicI64::new(clock.now_ns());
        Self {
            clock,
            count: AtomicI64::new(0),
            start_ns,
        }
    }

    /// Adds `n` to the running count.
    pub fn add(&self, n: i64) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }

    /// Snapshots the running count over the time elapsed since the last
    /// reset, without disturbing either.
    pub fn rate(&self) -> Rate {
        Rate {
            count: self.count.load(Ordering::SeqCst),
            elapsed_ns: self.clock.since_ns(self.start_ns.load(Ordering::SeqCst)),
        }
    }

    /// Like [`Recorder::rate`], but also resets the count to zero and the
    /// start mark to now, so consecutive takes measure disjoint windows.
    pub fn take_rate(&self) -> Rate {
        let now_ns = self.clock.now_ns();
        Rate {
            count: self.count.swap(0, Ordering::SeqCst),
            elapsed_ns: now_ns.saturating_sub(self.start_ns.swap(now_ns, Ordering::SeqCst)),
        }
    }

    /// Resets the count to zero and the start mark to now.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
        self.start_ns.store(self.clock.now_ns(), Ordering::SeqCst);
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("count", &self.count.load(Ordering::SeqCst))
            .field("start_ns", &self.start_ns.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// A count over a span of time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rate {
    count: i64,
    elapsed_ns: i64,
}

impl Rate {
    /// The recorded count.
    pub fn count(&self) -> i64 {
        self.count
    }

    /// The span the count was recorded over, in nanoseconds.
    pub fn elapsed_ns(&self) -> i64 {
        self.elapsed_ns
    }

    /// Rescales the rate to a count per `period_ns`. A zero elapsed span
    /// yields infinity (or NaN for a zero count), matching float division.
    pub fn per(&self, period_ns: i64) -> f64 {
        (self.count as f64 / self.elapsed_ns as f64) * period_ns as f64
    }

    /// Convenience for [`Rate::per`] with a one-second period.
    pub fn per_second(&self) -> f64 {
        self.per(SECOND_NS)
    }
}
