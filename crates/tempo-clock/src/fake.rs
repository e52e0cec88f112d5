use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::channel::TickSlot;
use crate::clock::Clock;
use crate::hooks::{Hook, ResolvedHooks};
use crate::timer::{Delivery, Ticker, Timer};
use crate::Timestamp;

/// Deadline value marking a record as stopped/inactive.
///
/// Any negative deadline is treated as the stopped sentinel, so a timer
/// whose computed deadline lands below zero (cursor + duration < 0) never
/// fires. Such deadlines only arise when the cursor itself has been set to
/// a deeply negative time.
const TOMBSTONE_NS: i64 = -1;

/// A pending alarm owned by a [`FakeClock`].
///
/// Fields are mutated only while holding the owning clock's timer lock; the
/// atomics exist for shared ownership across handles, not for lock-free
/// mutation.
pub(crate) struct FakeTimer {
    when_ns: AtomicI64,
    period_ns: AtomicI64,
    delivery: Delivery,
}

impl FakeTimer {
    fn new(when_ns: i64, period_ns: i64, delivery: Delivery) -> Arc<Self> {
        Arc::new(Self {
            when_ns: AtomicI64::new(when_ns),
            period_ns: AtomicI64::new(period_ns),
            delivery,
        })
    }

    fn when(&self) -> i64 {
        self.when_ns.load(Ordering::SeqCst)
    }

    fn set_when(&self, when_ns: i64) {
        self.when_ns.store(when_ns, Ordering::SeqCst);
    }

    fn period(&self) -> i64 {
        self.period_ns.load(Ordering::SeqCst)
    }

    fn is_ticker(&self) -> bool {
        self.period() > 0
    }

    pub(crate) fn ticks(&self) -> Option<crate::Ticks> {
        self.delivery.ticks()
    }

    /// Delivers one tick carrying the cursor value at firing. Channel sends
    /// use drop-oldest semantics and never block; callbacks are spawned on
    /// their own thread, never run inside the scan.
    fn fire(&self, now_ns: i64) {
        match &self.delivery {
            Delivery::Channel(slot) => slot.send(Timestamp::from_nanos(now_ns)),
            Delivery::Func(f) => {
                let f = Arc::clone(f);
                thread::spawn(move || f());
            }
        }
    }
}

impl std::fmt::Debug for FakeTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeTimer")
            .field("when_ns", &self.when())
            .field("period_ns", &self.period())
            .field("delivery", &self.delivery)
            .finish()
    }
}

/// A manually-driven clock for deterministic tests.
///
/// The cursor only moves when a driver calls [`FakeClock::advance`],
/// [`FakeClock::set_now_ns`], or [`FakeClock::set_time`]; each such call
/// runs a firing scan that delivers due timers and tickers. Handles may be
/// created, reset, and stopped from any thread concurrently with the
/// driver; the time-advancing operations themselves are meant to be called
/// from a single driving thread.
///
/// Cloning is cheap and all clones observe the same clock.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Inner>,
}

struct Inner {
    /// The cursor. Atomically updated so plain reads never tear and never
    /// take the timer lock.
    now_ns: AtomicI64,
    /// Pending alarms, sorted: non-negative deadlines ascending first,
    /// tombstoned records last. Restored after every mutation.
    timers: Mutex<Vec<Arc<FakeTimer>>>,
    hooks: ResolvedHooks,
}

impl std::fmt::Debug for FakeClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeClock")
            .field("now_ns", &self.inner.now_ns.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl FakeClock {
    /// Creates a fake clock with its cursor at 0 and no hooks.
    pub fn new() -> Self {
        Self::with_hooks([])
    }

    /// Creates a fake clock with lifecycle hooks. Hooks are resolved once
    /// here and immutable afterwards.
    pub fn with_hooks(hooks: impl IntoIterator<Item = Hook>) -> Self {
        Self {
            inner: Arc::new(Inner {
                now_ns: AtomicI64::new(0),
                timers: Mutex::new(Vec::new()),
                hooks: ResolvedHooks::resolve(hooks),
            }),
        }
    }

    /// Adds `delta_ns` (positive or negative) to the cursor, then fires
    /// every alarm whose deadline the cursor has reached. A backward move
    /// fires nothing and does not un-fire delivered alarms.
    pub fn advance(&self, delta_ns: i64) {
        let now_ns = self
            .inner
            .now_ns
            .fetch_add(delta_ns, Ordering::SeqCst)
            .wrapping_add(delta_ns);
        self.run_scan(now_ns);
    }

    /// Sets the cursor to an absolute value (which may be negative or move
    /// time backward), then runs the firing scan.
    pub fn set_now_ns(&self, now_ns: i64) {
        self.inner.now_ns.store(now_ns, Ordering::SeqCst);
        self.run_scan(now_ns);
    }

    /// Sets the cursor to `t`. Equivalent to `set_now_ns(t.as_nanos())`.
    pub fn set_time(&self, t: Timestamp) {
        self.set_now_ns(t.as_nanos());
    }

    /// Registers a new alarm with deadline `cursor + d_ns` captured now.
    ///
    /// Registration never runs the firing scan: an already-due timer
    /// (`d_ns <= 0`) is delivered by the next explicit `advance`/`set_*`
    /// call, not synchronously here.
    fn add_timer(&self, d_ns: i64, period_ns: i64, delivery: Delivery) -> Arc<FakeTimer> {
        let when_ns = self.now_ns().saturating_add(d_ns);
        let record = FakeTimer::new(when_ns, period_ns, delivery);

        let mut timers = self.lock_timers();
        // Insert after any equal deadline so ties keep insertion order.
        let at = timers.partition_point(|t| {
            let w = t.when();
            (0..=when_ns).contains(&w)
        });
        timers.insert(at, Arc::clone(&record));
        drop(timers);

        self.dispatch_create(d_ns, period_ns > 0);
        record
    }

    /// Re-arms `record` to `cursor + d_ns`, re-inserting it if a previous
    /// firing scan removed it. Returns whether it was active.
    pub(crate) fn reset_timer(&self, record: &Arc<FakeTimer>, d_ns: i64) -> bool {
        let mut timers = self.lock_timers();
        let prev_when = record.when();
        record.set_when(self.now_ns().saturating_add(d_ns));
        let is_ticker = record.is_ticker();
        if is_ticker {
            record.period_ns.store(d_ns, Ordering::SeqCst);
        }
        if !timers.iter().any(|t| Arc::ptr_eq(t, record)) {
            timers.push(Arc::clone(record));
        }
        sort_pending(&mut timers);
        drop(timers);

        self.dispatch_reset(d_ns, is_ticker);
        prev_when >= 0
    }

    /// Tombstones `record`. Returns whether it was active; idempotent.
    pub(crate) fn stop_timer(&self, record: &Arc<FakeTimer>) -> bool {
        let mut timers = self.lock_timers();
        let present = timers.iter().any(|t| Arc::ptr_eq(t, record));
        let was_active = record.when() >= 0;
        if was_active {
            record.set_when(TOMBSTONE_NS);
            sort_pending(&mut timers);
        }
        drop(timers);

        // The stop event is observable for any record still known to the
        // clock, even one that is already inactive.
        if present {
            self.dispatch_stop(record.is_ticker());
        }
        was_active
    }

    /// The firing scan. Walks the sorted pending list, delivering every
    /// alarm with `0 <= deadline <= now_ns`; the sort invariant lets it
    /// stop at the first record that is tombstoned or not yet due.
    ///
    /// Periodic alarms are rescheduled one period past the cursor at firing
    /// ("catch-up by dropping": one large advance delivers a single tick
    /// per ticker). One-shot alarms are stopped implicitly. Tombstoned
    /// records are physically removed afterwards.
    fn run_scan(&self, now_ns: i64) {
        let mut implicit_stops = 0usize;
        let mut timers = self.lock_timers();
        let mut fired = false;

        for record in timers.iter() {
            let when = record.when();
            if when < 0 || when > now_ns {
                break;
            }

            fired = true;
            record.fire(now_ns);

            let period = record.period();
            if period > 0 {
                record.set_when(now_ns.saturating_add(period));
            } else {
                record.set_when(TOMBSTONE_NS);
                implicit_stops += 1;
            }
        }

        if fired {
            timers.retain(|t| t.when() >= 0);
            timers.sort_by_key(|t| t.when());
        }
        drop(timers);

        for _ in 0..implicit_stops {
            self.dispatch_stop(false);
        }
    }

    /// Removes `record` from the pending list without firing or tombstoning
    /// it. Used by [`Clock::sleep`] to discard its private timer.
    fn remove_timer(&self, record: &Arc<FakeTimer>) {
        let mut timers = self.lock_timers();
        timers.retain(|t| !Arc::ptr_eq(t, record));
    }

    fn lock_timers(&self) -> std::sync::MutexGuard<'_, Vec<Arc<FakeTimer>>> {
        self.inner.timers.lock().expect("fake clock timer lock poisoned")
    }

    fn dispatch_create(&self, d_ns: i64, ticker: bool) {
        let list = if ticker {
            &self.inner.hooks.ticker_create
        } else {
            &self.inner.hooks.timer_create
        };
        if list.is_empty() {
            return;
        }
        let list = list.clone();
        let clock = self.clone();
        thread::spawn(move || {
            for f in &list {
                f(&clock, d_ns);
            }
        });
    }

    fn dispatch_reset(&self, d_ns: i64, ticker: bool) {
        let list = if ticker {
            &self.inner.hooks.ticker_reset
        } else {
            &self.inner.hooks.timer_reset
        };
        if list.is_empty() {
            return;
        }
        let list = list.clone();
        let clock = self.clone();
        thread::spawn(move || {
            for f in &list {
                f(&clock, d_ns);
            }
        });
    }

    fn dispatch_stop(&self, ticker: bool) {
        let list = if ticker {
            &self.inner.hooks.ticker_stop
        } else {
            &self.inner.hooks.timer_stop
        };
        if list.is_empty() {
            return;
        }
        let list = list.clone();
        let clock = self.clone();
        thread::spawn(move || {
            for f in &list {
                f(&clock);
            }
        });
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the pending-list invariant: non-negative deadlines ascending,
/// tombstones last. The sort is stable, so equal deadlines keep their
/// insertion order.
fn sort_pending(timers: &mut [Arc<FakeTimer>]) {
    timers.sort_by_key(|t| {
        let w = t.when();
        (w < 0, w)
    });
}

impl Clock for FakeClock {
    fn now_ns(&self) -> i64 {
        self.inner.now_ns.load(Ordering::SeqCst)
    }

    fn new_timer(&self, d_ns: i64) -> Timer {
        let record = self.add_timer(d_ns, 0, Delivery::Channel(TickSlot::new()));
        Timer::from_fake(self.clone(), record)
    }

    fn after_func(&self, d_ns: i64, f: Box<dyn Fn() + Send + Sync>) -> Timer {
        let record = self.add_timer(d_ns, 0, Delivery::Func(Arc::from(f)));
        Timer::from_fake(self.clone(), record)
    }

    fn new_ticker(&self, d_ns: i64) -> Ticker {
        assert!(d_ns > 0, "non-positive interval for new_ticker");
        let record = self.add_timer(d_ns, d_ns, Delivery::Channel(TickSlot::new()));
        Ticker::from_timer(Timer::from_fake(self.clone(), record))
    }

    /// Blocks until the cursor has advanced by `d_ns`.
    ///
    /// Some other thread must drive the clock forward, or this call never
    /// returns: never sleep on the thread that calls `advance`.
    fn sleep(&self, d_ns: i64) {
        let slot = TickSlot::new();
        let ticks = crate::Ticks::new(Arc::clone(&slot));
        let record = self.add_timer(d_ns, 0, Delivery::Channel(slot));
        let _ = ticks.recv();
        self.stop_timer(&record);
        self.remove_timer(&record);
    }
}
