//! Property-based tests for the bounded-retry reconnect policy.
//!
//! Verifies the retry contract for ALL drop sequences, not just specific
//! examples: the budget bounds the retry count exactly, the short delay is
//! spent at most once, and exhaustion is permanent.

use proptest::prelude::*;
use spotline_core::{DropCause, Reconnector, RetryConfig, RetryDecision};

/// Strategy for generating arbitrary drop causes
fn arbitrary_cause() -> impl Strategy<Value = DropCause> {
    prop_oneof![
        Just(DropCause::ConnectFailed),
        Just(DropCause::ClosedEarly),
        Just(DropCause::ClosedMidSession),
    ]
}

#[test]
fn prop_retry_count_is_min_of_drops_and_budget() {
    proptest!(|(
        causes in prop::collection::vec(arbitrary_cause(), 0..16),
        max_retries in 0u32..6,
    )| {
        let config = RetryConfig { max_retries, ..RetryConfig::default() };
        let mut policy = Reconnector::new(config);

        let mut retries = 0u32;
        for cause in &causes {
            if let RetryDecision::RetryAfter(_) = policy.on_drop(*cause) {
                retries += 1;
            }
        }

        // PROPERTY: exactly min(N, budget) retries for N drops.
        prop_assert_eq!(retries, (causes.len() as u32).min(max_retries));
        prop_assert_eq!(policy.attempts(), retries);
    });
}

#[test]
fn prop_short_delay_spent_at_most_once() {
    proptest!(|(causes in prop::collection::vec(arbitrary_cause(), 1..16))| {
        let config = RetryConfig::default();
        let short = config.early_close_delay;
        let mut policy = Reconnector::new(config);

        let mut short_delays = 0u32;
        for cause in &causes {
            if policy.on_drop(*cause) == RetryDecision::RetryAfter(short) {
                short_delays += 1;
            }
        }

        // PROPERTY: only the very first retry can use the early-close delay.
        prop_assert!(short_delays <= 1);
    });
}

#[test]
fn prop_give_up_is_permanent() {
    proptest!(|(
        causes in prop::collection::vec(arbitrary_cause(), 0..16),
        tail in prop::collection::vec(arbitrary_cause(), 1..8),
    )| {
        let mut policy = Reconnector::default();
        for cause in &causes {
            let _ = policy.on_drop(*cause);
        }

        if policy.is_exhausted() {
            // PROPERTY: once exhausted, every further drop is terminal.
            for cause in &tail {
                prop_assert_eq!(policy.on_drop(*cause), RetryDecision::GiveUp);
            }
        }
    });
}
