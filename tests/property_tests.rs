/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use rust_mail_api::retry::{PollPolicy, RetryOptions};
use rust_mail_api::validation::is_valid_email;
use std::time::Duration;

// Property: Email validation should never panic
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn well_formed_emails_accepted(
        local in "[a-z0-9._+-]{1,20}",
        domain in "[a-z0-9-]{1,15}",
        tld in "[a-z]{2,6}"
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        prop_assert!(is_valid_email(&email), "rejected {}", email);
    }

    #[test]
    fn emails_without_at_rejected(text in "[a-z0-9.]{0,30}") {
        prop_assert!(!is_valid_email(&text));
    }

    #[test]
    fn domains_without_dot_rejected(local in "[a-z0-9]{1,10}", domain in "[a-z0-9]{1,15}") {
        let email = format!("{}@{}", local, domain);
        prop_assert!(!is_valid_email(&email));
    }

    #[test]
    fn whitespace_always_rejected(
        local in "[a-z]{1,10}",
        domain in "[a-z]{1,10}",
        ws in prop::sample::select(vec![" ", "\t", "\n"])
    ) {
        let email = format!("{}{}x@{}.com", local, ws, domain);
        prop_assert!(!is_valid_email(&email));
    }
}

// Property: Backoff schedules never exceed their cap
proptest! {
    #[test]
    fn retry_delay_is_linear_and_capped(
        initial in 1u64..5_000,
        max in 1u64..20_000,
        attempt in 1u32..50
    ) {
        let options = RetryOptions::new(3, Duration::from_millis(initial), Duration::from_millis(max));
        let delay = options.delay_for_attempt(attempt);
        let expected = (initial * attempt as u64).min(max);
        prop_assert_eq!(delay, Duration::from_millis(expected));
    }

    #[test]
    fn poll_delay_never_decreases(
        initial in 1u64..1_000,
        max in 1u64..60_000,
        attempt in 1u32..30
    ) {
        let policy = PollPolicy {
            attempts: 5,
            initial_delay: Duration::from_millis(initial),
            max_delay: Duration::from_millis(max),
        };
        let current = policy.delay_for_attempt(attempt);
        let next = policy.delay_for_attempt(attempt + 1);
        prop_assert!(next >= current);
        prop_assert!(next <= Duration::from_millis(max));
    }
}
