use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::Timestamp;

/// Capacity-1 tick delivery slot with drop-oldest semantics: a send replaces
/// any undelivered value instead of blocking or queueing.
///
/// This is the delivery channel behind every timer and ticker, real or fake.
/// Senders never block, so the fake clock's firing scan cannot stall on a
/// slow receiver.
#[derive(Debug)]
pub(crate) struct TickSlot {
    state: Mutex<SlotState>,
    cond: Condvar,
}

#[derive(Debug)]
struct SlotState {
    value: Option<Timestamp>,
    closed: bool,
}

impl TickSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState {
                value: None,
                closed: false,
            }),
            cond: Condvar::new(),
        })
    }

    /// Publishes a tick, evicting any undelivered one. No-op after close.
    pub(crate) fn send(&self, ts: Timestamp) {
        let mut state = self.state.lock().expect("tick slot lock poisoned");
        if state.closed {
            return;
        }
        state.value = Some(ts);
        drop(state);
        self.cond.notify_all();
    }

    pub(crate) fn close(&self) {
        let mut state = self.state.lock().expect("tick slot lock poisoned");
        state.closed = true;
        drop(state);
        self.cond.notify_all();
    }

    fn try_recv(&self) -> Option<Timestamp> {
        self.state
            .lock()
            .expect("tick slot lock poisoned")
            .value
            .take()
    }

    fn recv(&self) -> Option<Timestamp> {
        let mut state = self.state.lock().expect("tick slot lock poisoned");
        loop {
            if let Some(ts) = state.value.take() {
                return Some(ts);
            }
            if state.closed {
                return None;
            }
            state = self.cond.wait(state).expect("tick slot lock poisoned");
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> Option<Timestamp> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().expect("tick slot lock poisoned");
        loop {
            if let Some(ts) = state.value.take() {
                return Some(ts);
            }
            if state.closed {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(state, deadline - now)
                .expect("tick slot lock poisoned");
            state = guard;
        }
    }
}

/// Receiving handle for timer/ticker notifications.
///
/// Cloneable; all clones observe the same slot, and a delivered tick is
/// consumed by exactly one receiver.
#[derive(Clone, Debug)]
pub struct Ticks {
    slot: Arc<TickSlot>,
}

impl Ticks {
    pub(crate) fn new(slot: Arc<TickSlot>) -> Self {
        Self { slot }
    }

    /// Blocks until a tick is delivered. Returns `None` once the channel is
    /// closed and drained.
    pub fn recv(&self) -> Option<Timestamp> {
        self.slot.recv()
    }

    /// Returns a pending tick without blocking, if one is available.
    pub fn try_recv(&self) -> Option<Timestamp> {
        self.slot.try_recv()
    }

    /// Like [`Ticks::recv`], but gives up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Timestamp> {
        self.slot.recv_timeout(timeout)
    }

    /// Closes the channel from the receiving side. Subsequent sends are
    /// dropped and blocked receivers wake with `None`. Used by consumers
    /// that need to unblock their own workers (e.g. a periodic runner
    /// shutting down).
    pub fn close(&self) {
        self.slot.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn send_then_recv() {
        let slot = TickSlot::new();
        slot.send(Timestamp::from_nanos(7));
        let ticks = Ticks::new(slot);
        assert_eq!(ticks.try_recv(), Some(Timestamp::from_nanos(7)));
        assert_eq!(ticks.try_recv(), None);
    }

    #[test]
    fn drop_oldest_keeps_most_recent() {
        let slot = TickSlot::new();
        slot.send(Timestamp::from_nanos(1));
        slot.send(Timestamp::from_nanos(2));
        slot.send(Timestamp::from_nanos(3));
        let ticks = Ticks::new(slot);
        assert_eq!(ticks.try_recv(), Some(Timestamp::from_nanos(3)));
        assert_eq!(ticks.try_recv(), None);
    }

    #[test]
    fn recv_wakes_on_send() {
        let slot = TickSlot::new();
        let ticks = Ticks::new(Arc::clone(&slot));
        let waiter = thread::spawn(move || ticks.recv());
        // The waiter may or may not be parked yet; send is valid either way.
        slot.send(Timestamp::from_nanos(42));
        assert_eq!(waiter.join().unwrap(), Some(Timestamp::from_nanos(42)));
    }

    #[test]
    fn close_unblocks_receivers() {
        let slot = TickSlot::new();
        let ticks = Ticks::new(Arc::clone(&slot));
        let waiter = thread::spawn(move || ticks.recv());
        slot.close();
        assert_eq!(waiter.join().unwrap(), None);
    }

    #[test]
    fn send_after_close_is_dropped() {
        let slot = TickSlot::new();
        slot.close();
        slot.send(Timestamp::from_nanos(1));
        let ticks = Ticks::new(slot);
        assert_eq!(ticks.recv(), None);
    }

    #[test]
    fn recv_timeout_expires() {
        let ticks = Ticks::new(TickSlot::new());
        assert_eq!(ticks.recv_timeout(Duration::from_millis(10)), None);
    }
}
