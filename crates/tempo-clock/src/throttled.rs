use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::clock::Clock;
use crate::timer::{Ticker, Timer};

/// A clock that trades precision for cheap reads.
///
/// A background thread samples the underlying time source every `interval_ns`
/// and publishes the sample to an atomic; [`Clock::now_ns`] is then a single
/// atomic load, regardless of how expensive the source is. Readers observe
/// time quantized to the sampling interval.
///
/// Timers, tickers, and sleeps bypass the cache and go straight to the
/// wrapped clock, so only `now_ns`/`now`/`since*` are throttled.
pub struct ThrottledClock {
    inner: Arc<dyn Clock>,
    cached_ns: Arc<AtomicI64>,
    interval_ns: i64,
    poller: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<Shutdown>,
}

struct Shutdown {
    requested: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl ThrottledClock {
    /// Wraps the default monotonic clock.
    ///
    /// # Panics
    ///
    /// Panics if `interval_ns <= 0`.
    pub fn new(interval_ns: i64) -> Self {
        Self::with_clock(Arc::new(crate::MonotonicClock::new()), interval_ns)
    }

    /// Wraps the default wall clock, so readers see cached Unix-epoch
    /// nanoseconds.
    ///
    /// # Panics
    ///
    /// Panics if `interval_ns <= 0`.
    pub fn with_wall(interval_ns: i64) -> Self {
        Self::with_clock(Arc::new(crate::WallClock::new()), interval_ns)
    }

    /// Wraps a nanosecond source directly.
    ///
    /// # Panics
    ///
    /// Panics if `interval_ns <= 0`.
    pub fn with_nanotime_fn(f: impl Fn() -> i64 + Send + Sync + 'static, interval_ns: i64) -> Self {
        Self::with_clock(
            Arc::new(crate::MonotonicClock::with_nanotime_fn(f)),
            interval_ns,
        )
    }

    /// Wraps `clock`, sampling it every `interval_ns`.
    ///
    /// # Panics
    ///
    /// Panics if `interval_ns <= 0`.
    pub fn with_clock(clock: Arc<dyn Clock>, interval_ns: i64) -> Self {
        assert!(interval_ns > 0, "non-positive interval for ThrottledClock");

        let cached_ns = Arc::new(AtomicI64::new(clock.now_ns()));
        let shutdown = Arc::new(Shutdown {
            requested: AtomicBool::new(false),
            lock: Mutex::new(()),
            cond: Condvar::new(),
        });

        let poller = {
            let clock = Arc::clone(&clock);
            let cached_ns = Arc::clone(&cached_ns);
            let shutdown = Arc::clone(&shutdown);
            let interval = Duration::from_nanos(interval_ns as u64);
            thread::spawn(move || {
                let mut guard = shutdown.lock.lock().expect("throttled poller lock poisoned");
                while !shutdown.requested.load(Ordering::SeqCst) {
                    cached_ns.store(clock.now_ns(), Ordering::SeqCst);
                    let (g, _) = shutdown
                        .cond
                        .wait_timeout(guard, interval)
                        .expect("throttled poller lock poisoned");
                    guard = g;
                }
            })
        };

        Self {
            inner: clock,
            cached_ns,
            interval_ns,
            poller: Mutex::new(Some(poller)),
            shutdown,
        }
    }

    /// The interval at which the cached time is refreshed.
    pub fn interval_ns(&self) -> i64 {
        self.interval_ns
    }

    /// Stops the sampling thread and waits for it to exit. The last published
    /// sample stays readable; further calls are no-ops.
    pub fn stop(&self) {
        self.shutdown.requested.store(true, Ordering::SeqCst);
        self.shutdown.cond.notify_all();
        let handle = self
            .poller
            .lock()
            .expect("throttled poller lock poisoned")
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for ThrottledClock {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ThrottledClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledClock")
            .field("cached_ns", &self.cached_ns.load(Ordering::SeqCst))
            .field("interval_ns", &self.interval_ns)
            .finish_non_exhaustive()
    }
}

impl Clock for ThrottledClock {
    fn now_ns(&self) -> i64 {
        self.cached_ns.load(Ordering::SeqCst)
    }

    fn new_timer(&self, d_ns: i64) -> Timer {
        self.inner.new_timer(d_ns)
    }

    fn after_func(&self, d_ns: i64, f: Box<dyn Fn() + Send + Sync>) -> Timer {
        self.inner.after_func(d_ns, f)
    }

    fn new_ticker(&self, d_ns: i64) -> Ticker {
        self.inner.new_ticker(d_ns)
    }

    fn sleep(&self, d_ns: i64) {
        self.inner.sleep(d_ns);
    }
}
