use proptest::prelude::*;

use tempo_clock::{Clock, FakeClock, Timestamp};

// Keep individual deltas small enough that a test-length sequence of them
// cannot overflow the cursor.
fn deltas() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1_000_000_000_000i64..1_000_000_000_000, 0..100)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        rng_algorithm: proptest::test_runner::RngAlgorithm::ChaCha,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0x7E_4B_0C),
        .. ProptestConfig::default()
    })]

    #[test]
    fn advance_accumulates(deltas in deltas()) {
        let clock = FakeClock::new();
        let mut expected = 0i64;
        for d in deltas {
            clock.advance(d);
            expected += d;
            prop_assert_eq!(clock.now_ns(), expected);
        }
    }

    #[test]
    fn set_now_reads_back(now_ns in any::<i64>()) {
        let clock = FakeClock::new();
        clock.set_now_ns(now_ns);
        prop_assert_eq!(clock.now_ns(), now_ns);
        prop_assert_eq!(clock.now(), Timestamp::from_nanos(now_ns));
    }

    #[test]
    fn timer_fires_exactly_once_at_or_after_deadline(
        d_ns in 1i64..1_000_000,
        steps in prop::collection::vec(1i64..100_000, 1..50),
    ) {
        let clock = FakeClock::new();
        let ticks = clock.after(d_ns);

        let mut cursor = 0i64;
        let mut delivered = false;
        for step in steps {
            cursor += step;
            clock.advance(step);
            match ticks.try_recv() {
                Some(at) => {
                    prop_assert!(!delivered, "one-shot timer fired twice");
                    prop_assert!(cursor >= d_ns, "fired before its deadline");
                    prop_assert_eq!(at, Timestamp::from_nanos(cursor));
                    delivered = true;
                }
                None => {
                    prop_assert!(
                        delivered || cursor < d_ns,
                        "due timer not delivered at cursor {}",
                        cursor
                    );
                }
            }
        }
    }

    #[test]
    fn ticker_never_outruns_elapsed_time(
        period_ns in 1i64..10_000,
        steps in prop::collection::vec(1i64..50_000, 1..50),
    ) {
        let clock = FakeClock::new();
        let ticker = clock.new_ticker(period_ns);
        let ticks = ticker.ticks();

        let mut delivered = 0i64;
        for step in &steps {
            clock.advance(*step);
            if ticks.try_recv().is_some() {
                delivered += 1;
            }
        }

        // Drop-oldest delivery means at most one tick per advance, and never
        // more ticks than full periods elapsed.
        let elapsed: i64 = steps.iter().sum();
        prop_assert!(delivered <= steps.len() as i64);
        prop_assert!(delivered <= elapsed / period_ns);
        ticker.stop();
    }

    #[test]
    fn timestamp_arithmetic_is_consistent(a in any::<i64>(), d in any::<i64>()) {
        let t = Timestamp::from_nanos(a);
        let moved = t.add_ns(d);
        prop_assert_eq!(moved.as_nanos(), a.saturating_add(d));
        prop_assert_eq!(moved - t, moved.as_nanos().saturating_sub(a));
        prop_assert_eq!(t.sub_ns(moved), a.saturating_sub(moved.as_nanos()));
    }
}
