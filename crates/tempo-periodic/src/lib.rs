//! Runs a function periodically on a background thread.
//!
//! [`Handle::start`] spawns a worker that invokes the function every period,
//! measured by a [`Clock`] — so with a
//! [`FakeClock`](tempo_clock::FakeClock) the schedule is driven manually by
//! tests. [`Handle::stop`] cancels the schedule and waits for an in-flight
//! invocation to finish before returning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tempo_clock::{Clock, MonotonicClock, Ticker, Ticks};
use tracing::debug;

/// Cooperative cancellation flag handed to the periodic function.
///
/// Long-running invocations should poll [`CancelToken::is_cancelled`] and
/// return early once it reports true, since [`Handle::stop`] waits for the
/// current invocation to return.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// A function that can be run periodically. Invocations should abide by the
/// given [`CancelToken`].
pub type Func = Box<dyn Fn(&CancelToken) + Send + Sync>;

/// Manages a [`Func`] that is running periodically.
///
/// The schedule runs until [`Handle::stop`] is called or the handle is
/// dropped.
pub struct Handle {
    func: Arc<dyn Fn(&CancelToken) + Send + Sync>,
    token: CancelToken,
    ticker: Option<Ticker>,
    ticks: Option<Ticks>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Handle {
    /// Starts running `f` every `period_ns`, measured by the system's
    /// monotonic clock. A non-positive period runs `f` back-to-back with no
    /// delay.
    pub fn start(period_ns: i64, f: Func) -> Self {
        Self::start_with_clock(Arc::new(MonotonicClock::new()), period_ns, f)
    }

    /// Like [`Handle::start`], but measures the period with `clock`.
    ///
    /// The ticker is registered before this returns, so a test driving a
    /// fake clock can advance it immediately afterwards without racing the
    /// worker.
    pub fn start_with_clock(clock: Arc<dyn Clock>, period_ns: i64, f: Func) -> Self {
        let func: Arc<dyn Fn(&CancelToken) + Send + Sync> = Arc::from(f);
        let token = CancelToken::new();
        let ticker = (period_ns > 0).then(|| clock.new_ticker(period_ns));
        let ticks = ticker.as_ref().map(Ticker::ticks);

        let worker = {
            let func = Arc::clone(&func);
            let token = token.clone();
            let ticks = ticks.clone();
            thread::spawn(move || run_loop(&*func, &token, ticks.as_ref(), period_ns))
        };

        Self {
            func,
            token,
            ticker,
            ticks,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Runs the function once, immediately, on the calling thread. Does not
    /// affect the periodic schedule.
    pub fn run(&self) {
        (self.func)(&self.token);
    }

    /// Cancels the schedule and waits for the worker (including any
    /// in-flight invocation) to exit. Idempotent.
    pub fn stop(&self) {
        self.token.cancel();
        if let Some(ticker) = &self.ticker {
            ticker.stop();
        }
        if let Some(ticks) = &self.ticks {
            // Wake a worker parked on the tick channel.
            ticks.close();
        }
        let worker = self.worker.lock().expect("periodic worker lock poisoned").take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn run_loop(
    func: &(dyn Fn(&CancelToken) + Send + Sync),
    token: &CancelToken,
    ticks: Option<&Ticks>,
    period_ns: i64,
) {
    debug!(period_ns, "periodic worker started");
    loop {
        if let Some(ticks) = ticks {
            if ticks.recv().is_none() {
                break;
            }
        }
        // A cancellation that raced the tick wins.
        if token.is_cancelled() {
            break;
        }
        func(token);
    }
    debug!("periodic worker exited");
}
