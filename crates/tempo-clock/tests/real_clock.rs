use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tempo_clock::{
    Clock, ClockBuilder, Error, MonotonicClock, Stopwatch, ThrottledClock, Timestamp, WallClock,
};

// Real-time tests assert only "it happened within a generous window" so they
// stay reliable on loaded CI machines.
const WAIT: Duration = Duration::from_secs(2);

#[test]
fn monotonic_time_never_goes_backwards() {
    let clock = MonotonicClock::new();
    let mut prev = clock.now_ns();
    for _ in 0..1_000 {
        let now = clock.now_ns();
        assert!(now >= prev);
        prev = now;
    }
}

#[test]
fn wall_time_tracks_the_system_clock() {
    let clock = WallClock::new();
    let system = Timestamp::from_system_time(std::time::SystemTime::now());
    let skew = (clock.now() - system).abs();
    assert!(skew < 60_000_000_000, "wall clock skew of {skew}ns");
}

#[test]
fn real_timer_fires() {
    let clock = MonotonicClock::new();
    let before = clock.now_ns();
    let timer = clock.new_timer(10_000_000); // 10ms
    let ticks = timer.ticks().unwrap();
    let at = ticks.recv_timeout(WAIT).expect("timer never fired");
    assert!(at.as_nanos() >= before + 10_000_000);
}

#[test]
fn real_timer_stop_then_reset() {
    let clock = MonotonicClock::new();
    let timer = clock.new_timer(50_000_000);
    let ticks = timer.ticks().unwrap();

    assert!(timer.stop());
    assert!(!timer.stop());
    assert_eq!(ticks.recv_timeout(Duration::from_millis(100)), None);

    assert!(!timer.reset(1_000_000));
    assert!(ticks.recv_timeout(WAIT).is_some());
}

#[test]
fn real_after_func_runs() {
    let clock = MonotonicClock::new();
    let (tx, rx) = mpsc::channel();
    let _timer = clock.after_func(
        1_000_000,
        Box::new(move || {
            tx.send(()).unwrap();
        }),
    );
    rx.recv_timeout(WAIT).expect("callback never ran");
}

#[test]
fn real_ticker_keeps_ticking() {
    let clock = MonotonicClock::new();
    let ticker = clock.new_ticker(5_000_000); // 5ms
    let ticks = ticker.ticks();
    for _ in 0..3 {
        assert!(ticks.recv_timeout(WAIT).is_some(), "ticker stalled");
    }
    ticker.stop();
}

#[test]
fn sleep_blocks_for_roughly_the_duration() {
    let clock = MonotonicClock::new();
    let before = clock.now_ns();
    clock.sleep(5_000_000);
    assert!(clock.since_ns(before) >= 5_000_000);
    // Non-positive sleeps return immediately.
    clock.sleep(0);
    clock.sleep(-1);
}

#[test]
fn builder_requires_a_source() {
    assert!(matches!(
        ClockBuilder::new().build(),
        Err(Error::NoTimeSource)
    ));
}

#[test]
fn builder_uses_the_given_nanotime_fn() {
    let calls = Arc::new(AtomicI64::new(0));
    let clock = {
        let calls = Arc::clone(&calls);
        ClockBuilder::new()
            .with_nanotime_fn(move || calls.fetch_add(1, Ordering::SeqCst))
            .build()
            .unwrap()
    };
    assert_eq!(clock.now_ns(), 0);
    assert_eq!(clock.now_ns(), 1);
    assert_eq!(clock.since_ns(0), 2);
}

#[test]
fn builder_uses_the_given_time_fn() {
    let clock = ClockBuilder::new()
        .with_time_fn(|| Timestamp::from_nanos(1_234))
        .build()
        .unwrap();
    assert_eq!(clock.now(), Timestamp::from_nanos(1_234));
    assert_eq!(clock.now_ns(), 1_234);
}

#[test]
fn builder_last_source_wins() {
    let clock = ClockBuilder::new()
        .with_time_fn(|| Timestamp::from_nanos(1))
        .with_nanotime_fn(|| 2)
        .build()
        .unwrap();
    assert_eq!(clock.now_ns(), 2);
}

#[test]
fn throttled_clock_samples_its_source() {
    let source = Arc::new(AtomicI64::new(100));
    let clock = {
        let source = Arc::clone(&source);
        ThrottledClock::with_nanotime_fn(move || source.load(Ordering::SeqCst), 1_000_000)
    };

    // The initial sample is taken synchronously at construction.
    assert_eq!(clock.now_ns(), 100);

    source.store(200, Ordering::SeqCst);
    let deadline = std::time::Instant::now() + WAIT;
    while clock.now_ns() != 200 {
        assert!(std::time::Instant::now() < deadline, "poller never sampled");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn throttled_clock_reports_its_interval() {
    let clock = ThrottledClock::new(5_000_000);
    assert_eq!(clock.interval_ns(), 5_000_000);
}

#[test]
fn throttled_wall_clock_is_near_the_system_clock() {
    let clock = ThrottledClock::with_wall(1_000_000);
    assert_eq!(clock.interval_ns(), 1_000_000);
    let system = Timestamp::from_system_time(std::time::SystemTime::now());
    let skew = (clock.now() - system).abs();
    assert!(skew < 60_000_000_000, "throttled wall clock skew of {skew}ns");
}

#[test]
fn throttled_clock_stop_is_idempotent() {
    let clock = ThrottledClock::new(1_000_000);
    clock.stop();
    clock.stop();
    // Reads still return the last sample.
    let _ = clock.now_ns();
}

#[test]
#[should_panic(expected = "non-positive interval")]
fn throttled_clock_rejects_zero_interval() {
    let _ = ThrottledClock::new(0);
}

#[test]
fn stopwatch_measures_real_time() {
    let watch = Stopwatch::new();
    std::thread::sleep(Duration::from_millis(5));
    let elapsed = watch.reset();
    assert!(elapsed >= 5_000_000);
    assert!(watch.elapsed_ns() < elapsed);
}
