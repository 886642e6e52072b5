//! What a failed backend mutation does to the feed

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failure handling for optimistic mutations
///
/// The local change is always applied first; the policy only decides what
/// happens when the backend call behind it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationPolicy {
    /// Log, publish `MutationFailed`, keep the local change
    #[default]
    Ignore,
    /// Retry transient failures with doubling backoff, then behave as `Ignore`
    Retry {
        /// Retries after the first call
        attempts: u32,
        /// Delay before the first retry, in milliseconds
        backoff_ms: u64,
    },
    /// Undo the local change and publish `MutationReverted`
    Revert,
}

impl MutationPolicy {
    /// Retry policy
    #[inline]
    #[must_use]
    pub fn retry(attempts: u32, backoff: Duration) -> Self {
        Self::Retry {
            attempts,
            backoff_ms: u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Delay before retry number `retry` (1-based); `None` once retries are spent
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Option<Duration> {
        match *self {
            Self::Retry {
                attempts,
                backoff_ms,
            } if retry >= 1 && retry <= attempts => {
                let shift = (retry - 1).min(16);
                Some(Duration::from_millis(backoff_ms.saturating_mul(1u64 << shift)))
            }
            _ => None,
        }
    }

    /// Whether failures undo the local change
    #[inline]
    #[must_use]
    pub fn reverts(&self) -> bool {
        matches!(self, Self::Revert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ignores() {
        assert_eq!(MutationPolicy::default(), MutationPolicy::Ignore);
        assert_eq!(MutationPolicy::Ignore.backoff_for(1), None);
        assert!(!MutationPolicy::Ignore.reverts());
    }

    #[test]
    fn retry_backoff_doubles() {
        let policy = MutationPolicy::retry(3, Duration::from_millis(200));
        assert_eq!(policy.backoff_for(0), None);
        assert_eq!(policy.backoff_for(1), Some(Duration::from_millis(200)));
        assert_eq!(policy.backoff_for(2), Some(Duration::from_millis(400)));
        assert_eq!(policy.backoff_for(3), Some(Duration::from_millis(800)));
        assert_eq!(policy.backoff_for(4), None);
    }

    #[test]
    fn parses_from_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: MutationPolicy,
        }
        let parsed: Wrapper =
            toml::from_str("policy = { kind = \"retry\", attempts = 2, backoff_ms = 50 }").unwrap();
        assert_eq!(parsed.policy, MutationPolicy::retry(2, Duration::from_millis(50)));

        let parsed: Wrapper = toml::from_str("policy = { kind = \"revert\" }").unwrap();
        assert!(parsed.policy.reverts());
    }
}
