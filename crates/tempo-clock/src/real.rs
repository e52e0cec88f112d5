use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::channel::Ticks;
use crate::clock::NanotimeFn;
use crate::timer::Delivery;
use crate::Timestamp;

/// A timer/ticker backed by a dedicated worker thread waiting on a
/// [`Condvar`] deadline.
///
/// Reset and stop mutate the shared deadline state and wake the worker.
/// Dropping the handle never cancels a pending fire: the worker exits once
/// the handle is gone *and* no alarm is armed, so a one-shot created by
/// `after` fires and then cleans up, while an unstopped ticker keeps its
/// worker alive indefinitely (mirroring the documented leak of the
/// convenience channels).
pub(crate) struct RealTimer {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
    delivery: Delivery,
    now_fn: NanotimeFn,
}

struct State {
    deadline: Option<Instant>,
    period: Option<Duration>,
    active: bool,
    handle_dropped: bool,
}

fn deadline_after(d_ns: i64) -> Instant {
    let now = Instant::now();
    if d_ns > 0 {
        now + Duration::from_nanos(d_ns as u64)
    } else {
        // Already due; the worker fires on its next pass.
        now
    }
}

impl RealTimer {
    /// Spawns the worker. `period_ns` is `Some` for tickers; callers enforce
    /// that ticker periods are positive.
    pub(crate) fn spawn(
        now_fn: NanotimeFn,
        d_ns: i64,
        period_ns: Option<i64>,
        delivery: Delivery,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                deadline: Some(deadline_after(d_ns)),
                period: period_ns.map(|p| Duration::from_nanos(p as u64)),
                active: true,
                handle_dropped: false,
            }),
            cond: Condvar::new(),
            delivery,
            now_fn,
        });

        let worker_shared = Arc::clone(&shared);
        thread::spawn(move || run_worker(&worker_shared));

        Self { shared }
    }

    pub(crate) fn ticks(&self) -> Option<Ticks> {
        self.shared.delivery.ticks()
    }

    pub(crate) fn reset(&self, d_ns: i64, update_period: bool) -> bool {
        let mut state = self.shared.state.lock().expect("real timer lock poisoned");
        let was_active = state.active;
        state.deadline = Some(deadline_after(d_ns));
        if update_period {
            state.period = Some(Duration::from_nanos(d_ns.max(0) as u64));
        }
        state.active = true;
        drop(state);
        self.shared.cond.notify_all();
        was_active
    }

    pub(crate) fn stop(&self) -> bool {
        let mut state = self.shared.state.lock().expect("real timer lock poisoned");
        let was_active = state.active;
        state.active = false;
        state.deadline = None;
        drop(state);
        self.shared.cond.notify_all();
        was_active
    }
}

impl Drop for RealTimer {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock().expect("real timer lock poisoned");
        state.handle_dropped = true;
        drop(state);
        self.shared.cond.notify_all();
    }
}

impl fmt::Debug for RealTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RealTimer")
    }
}

fn run_worker(shared: &Shared) {
    let mut state = shared.state.lock().expect("real timer lock poisoned");
    loop {
        if !state.active {
            if state.handle_dropped {
                return;
            }
            state = shared.cond.wait(state).expect("real timer lock poisoned");
            continue;
        }

        let deadline = match state.deadline {
            Some(deadline) => deadline,
            None => {
                state.active = false;
                continue;
            }
        };

        let now = Instant::now();
        if now < deadline {
            let (guard, _) = shared
                .cond
                .wait_timeout(state, deadline - now)
                .expect("real timer lock poisoned");
            state = guard;
            continue;
        }

        match state.period {
            Some(period) => {
                state.deadline = Some(deadline + period);
            }
            None => {
                state.active = false;
                state.deadline = None;
            }
        }

        // Deliver outside the lock so a callback cannot block reset/stop.
        drop(state);
        match &shared.delivery {
            Delivery::Channel(slot) => slot.send(Timestamp::from_nanos((shared.now_fn)())),
            Delivery::Func(f) => f(),
        }
        state = shared.state.lock().expect("real timer lock poisoned");
    }
}
