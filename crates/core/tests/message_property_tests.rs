//! Property-based tests for message validation and mirror bookkeeping.
//!
//! These use `proptest` to check rules that must hold for every input, not
//! just the handful of cases the unit tests pick.

use std::time::Duration;

use bookchat_core::errors::{Error, ValidationError};
use bookchat_core::messages::NewMessage;
use bookchat_core::mirror::{parse_target, MirrorError, MirrorPolicy, MirrorResult};
use proptest::prelude::*;

// =============================================================================
// Generators
// =============================================================================

fn arb_segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9._-]{0,20}"
}

fn arb_token() -> impl Strategy<Value = String> {
    "ghp_[A-Za-z0-9]{8,36}"
}

/// A mix of successes and failures over distinct target indexes.
fn arb_results() -> impl Strategy<Value = Vec<MirrorResult>> {
    prop::collection::btree_map(1usize..20, any::<bool>(), 0..8).prop_map(|targets| {
        targets
            .into_iter()
            .map(|(index, ok)| {
                let repository = format!("owner/repo{index}");
                if ok {
                    MirrorResult::mirrored(index, repository, format!("url-{index}"), None)
                } else {
                    MirrorResult::failed(
                        index,
                        repository,
                        MirrorError::Network("unreachable".to_string()),
                    )
                }
            })
            .collect()
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn whitespace_only_content_is_rejected(content in "[ \t\r\n]{0,16}") {
        let err = NewMessage::new(content).unwrap_err();
        prop_assert!(matches!(err, Error::Validation(ValidationError::EmptyMessage)));
    }

    #[test]
    fn content_with_text_is_kept_verbatim(
        prefix in "[ \t]{0,4}",
        body in "[a-zA-Z0-9!?.,]{1,40}",
        suffix in "[ \n]{0,4}",
    ) {
        let content = format!("{prefix}{body}{suffix}");
        let message = NewMessage::new(content.clone()).unwrap();
        prop_assert_eq!(message.content(), content.as_str());
    }

    #[test]
    fn valid_targets_parse_into_their_parts(
        owner in arb_segment(),
        name in arb_segment(),
        token in arb_token(),
        index in 1usize..100,
    ) {
        let raw = format!("{owner}/{name}:{token}");
        let target = parse_target(index, "GITHUB_REPO_X", &raw).unwrap();
        prop_assert_eq!(target.index, index);
        prop_assert_eq!(&target.owner, &owner);
        prop_assert_eq!(&target.name, &name);
        prop_assert_eq!(target.credential.expose(), token.as_str());
        let debug_repr = format!("{target:?}");
        prop_assert!(!debug_repr.contains(&token));
    }

    #[test]
    fn malformed_targets_never_echo_the_token(
        owner in arb_segment(),
        token in arb_token(),
    ) {
        let raw = format!("{owner}:{token}");
        let err = parse_target(1, "GITHUB_REPO_1", &raw).unwrap_err();
        prop_assert!(!err.to_string().contains(&token));
    }

    #[test]
    fn first_url_is_the_lowest_successful_target(results in arb_results()) {
        let expected = results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.target)
            .min()
            .map(|index| format!("url-{index}"));
        prop_assert_eq!(MirrorResult::first_url(&results), expected);
    }

    #[test]
    fn backoff_is_bounded_and_non_decreasing(
        base_ms in 1u64..2_000,
        max_ms in 1u64..60_000,
        attempts in 1u32..16,
    ) {
        let policy = MirrorPolicy {
            max_attempts: attempts,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
            ..MirrorPolicy::default()
        };
        let mut previous = Duration::ZERO;
        for attempt in 1..=attempts {
            let delay = policy.backoff(attempt, None);
            prop_assert!(delay <= policy.max_delay);
            prop_assert!(delay >= previous);
            previous = delay;
        }
    }
}
