use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::Error;

/// Options for [`Stopwatch::with_options`].
#[derive(Clone, Default)]
pub struct StopwatchOptions {
    clock: Option<Arc<dyn Clock>>,
}

impl StopwatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measures elapsed time against `clock` instead of the default
    /// monotonic clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl std::fmt::Debug for StopwatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopwatchOptions")
            .field("clock", &self.clock.as_ref().map(|_| "..."))
            .finish()
    }
}

/// Measures elapsed time from a start mark.
///
/// The watch starts at construction; [`Stopwatch::reset`] reads the elapsed
/// time and moves the mark to now in one step, so back-to-back resets
/// measure consecutive non-overlapping intervals.
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    start_ns: AtomicI64,
}

impl Stopwatch {
    /// Starts a stopwatch on the default monotonic clock.
    pub fn new() -> Self {
        Self::start_on(Arc::new(crate::MonotonicClock::new()))
    }

    /// Starts a stopwatch with explicit options.
    ///
    /// Returns [`Error::NoClock`] if the options carry no clock; use
    /// [`Stopwatch::new`] for the default.
    pub fn with_options(options: StopwatchOptions) -> Result<Self, Error> {
        let clock = options.clock.ok_or(Error::NoClock)?;
        Ok(Self::start_on(clock))
    }

    fn start_on(clock: Arc<dyn Clock>) -> Self {
        let start_ns = AtomicI64::new(clock.now_ns());
        Self { clock, start_ns }
    }

    /// Returns the nanoseconds elapsed since the start mark without moving
    /// it.
    pub fn elapsed_ns(&self) -> i64 {
        self.clock.since_ns(self.start_ns.load(Ordering::SeqCst))
    }

    /// Returns the elapsed nanoseconds and atomically moves the start mark
    /// to now.
    pub fn reset(&self) -> i64 {
        let now_ns = self.clock.now_ns();
        let start_ns = self.start_ns.swap(now_ns, Ordering::SeqCst);
        now_ns.saturating_sub(start_ns)
    }
}

impl std::fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stopwatch")
            .field("start_ns", &self.start_ns.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FakeClock;

    #[test]
    fn elapsed_follows_the_clock() {
        let clock = FakeClock::new();
        let watch = Stopwatch::with_options(
            StopwatchOptions::new().with_clock(Arc::new(clock.clone())),
        )
        .unwrap();

        assert_eq!(watch.elapsed_ns(), 0);
        clock.advance(250);
        assert_eq!(watch.elapsed_ns(), 250);
        clock.advance(250);
        assert_eq!(watch.elapsed_ns(), 500);
    }

    #[test]
    fn reset_returns_elapsed_and_restarts() {
        let clock = FakeClock::new();
        let watch = Stopwatch::with_options(
            StopwatchOptions::new().with_clock(Arc::new(clock.clone())),
        )
        .unwrap();

        clock.advance(100);
        assert_eq!(watch.reset(), 100);
        assert_eq!(watch.elapsed_ns(), 0);
        clock.advance(40);
        assert_eq!(watch.reset(), 40);
    }

    #[test]
    fn options_without_clock_is_an_error() {
        let err = Stopwatch::with_options(StopwatchOptions::new()).unwrap_err();
        assert_eq!(err, Error::NoClock);
    }
}
