use std::sync::Arc;

use tempo_clock::FakeClock;
use tempo_rate::{Rate, Recorder, SECOND_NS};

fn fake_recorder() -> (FakeClock, Recorder) {
    let clock = FakeClock::new();
    let recorder = Recorder::with_clock(Arc::new(clock.clone()));
    (clock, recorder)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected ~{expected}, got {actual}"
    );
}

#[test]
fn rate_reports_count_over_elapsed() {
    let (clock, recorder) = fake_recorder();
    recorder.add(10);
    clock.advance(SECOND_NS);

    let rate = recorder.rate();
    assert_eq!(rate.count(), 10);
    assert_eq!(rate.elapsed_ns(), SECOND_NS);
    assert_close(rate.per_second(), 10.0);
    assert_close(rate.per(SECOND_NS / 2), 5.0);
    assert_close(rate.per(2 * SECOND_NS), 20.0);
}

#[test]
fn rate_does_not_disturb_the_recorder() {
    let (clock, recorder) = fake_recorder();
    recorder.add(4);
    clock.advance(SECOND_NS);

    let first = recorder.rate();
    let second = recorder.rate();
    assert_eq!(first, second);

    recorder.add(4);
    clock.advance(SECOND_NS);
    assert_close(recorder.rate().per_second(), 4.0);
}

#[test]
fn take_rate_starts_a_fresh_window() {
    let (clock, recorder) = fake_recorder();
    recorder.add(6);
    clock.advance(2 * SECOND_NS);

    let taken = recorder.take_rate();
    assert_eq!(taken.count(), 6);
    assert_eq!(taken.elapsed_ns(), 2 * SECOND_NS);
    assert_close(taken.per_second(), 3.0);

    // The next window is disjoint from the first.
    recorder.add(1);
    clock.advance(SECOND_NS);
    let next = recorder.take_rate();
    assert_eq!(next.count(), 1);
    assert_eq!(next.elapsed_ns(), SECOND_NS);
}

#[test]
fn reset_clears_count_and_restarts_the_window() {
    let (clock, recorder) = fake_recorder();
    recorder.add(100);
    clock.advance(SECOND_NS);

    recorder.reset();
    let rate = recorder.rate();
    assert_eq!(rate.count(), 0);
    assert_eq!(rate.elapsed_ns(), 0);
}

#[test]
fn negative_counts_are_allowed() {
    let (clock, recorder) = fake_recorder();
    recorder.add(10);
    recorder.add(-4);
    clock.advance(SECOND_NS);
    assert_close(recorder.rate().per_second(), 6.0);
}

#[test]
fn zero_elapsed_rate_is_not_finite() {
    let (_clock, recorder) = fake_recorder();
    recorder.add(1);
    assert!(recorder.rate().per_second().is_infinite());
}

#[test]
fn real_clock_recorder_counts() {
    let recorder = Recorder::new();
    for _ in 0..5 {
        recorder.add(1);
    }
    let rate: Rate = recorder.rate();
    assert_eq!(rate.count(), 5);
    assert!(rate.elapsed_ns() >= 0);
}
