//! Property-Based Tests for the SM-2 scheduler
//!
//! Invariants under test:
//! - Failing quality (< 3) always resets repetitions to 0 and interval to 1
//! - The ease factor never drops below its 1.3 floor
//! - Successful reviews never shrink repetitions
//! - Intervals are always at least one day
//! - Quality outside [0, 5] is always rejected

use proptest::prelude::*;

use vocabquiz_backend_rust::services::memory::{advance, MemoryState, MIN_EASE_FACTOR};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_memory_state() -> impl Strategy<Value = MemoryState> {
    (
        (1300u64..=5000u64).prop_map(|v| v as f64 / 1000.0), // ease in [1.3, 5.0]
        1i64..=365i64,                                       // interval
        0i64..=50i64,                                        // repetitions
    )
        .prop_map(|(ease_factor, interval_days, repetitions)| MemoryState {
            ease_factor,
            interval_days,
            repetitions,
        })
}

proptest! {
    #[test]
    fn failure_always_resets(state in arb_memory_state(), quality in 0i32..3) {
        let next = advance(&state, quality).unwrap();
        prop_assert_eq!(next.repetitions, 0);
        prop_assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn ease_floor_holds(state in arb_memory_state(), quality in 0i32..=5) {
        let next = advance(&state, quality).unwrap();
        prop_assert!(next.ease_factor >= MIN_EASE_FACTOR);
    }

    #[test]
    fn success_increments_repetitions(state in arb_memory_state(), quality in 3i32..=5) {
        let next = advance(&state, quality).unwrap();
        prop_assert_eq!(next.repetitions, state.repetitions + 1);
    }

    #[test]
    fn interval_is_positive(state in arb_memory_state(), quality in 0i32..=5) {
        let next = advance(&state, quality).unwrap();
        prop_assert!(next.interval_days >= 1);
    }

    #[test]
    fn mature_success_grows_interval(state in arb_memory_state(), quality in 3i32..=5) {
        // once past the fixed 1/6 day openers the interval scales by ease
        prop_assume!(state.repetitions >= 2);
        let next = advance(&state, quality).unwrap();
        prop_assert_eq!(
            next.interval_days,
            (state.interval_days as f64 * state.ease_factor) as i64
        );
        prop_assert!(next.interval_days >= state.interval_days);
    }

    #[test]
    fn out_of_range_quality_rejected(state in arb_memory_state(), quality in prop_oneof![-100i32..0, 6i32..100]) {
        prop_assert!(advance(&state, quality).is_err());
    }

    #[test]
    fn quality_five_never_lowers_ease(state in arb_memory_state()) {
        let next = advance(&state, 5).unwrap();
        prop_assert!(next.ease_factor >= state.ease_factor);
    }
}
