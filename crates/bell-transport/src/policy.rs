//! Reconnect delay policy

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between reconnect attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How long to wait before the next connection attempt
///
/// Retries never give up; the policy only shapes the delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Same delay every time
    Fixed {
        /// Delay in milliseconds
        delay_ms: u64,
    },
    /// Doubling delay, capped
    Exponential {
        /// First delay in milliseconds
        initial_ms: u64,
        /// Upper bound in milliseconds
        max_ms: u64,
    },
}

impl ReconnectPolicy {
    /// Fixed delay
    #[inline]
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed {
            delay_ms: millis(delay),
        }
    }

    /// Doubling delay between `initial` and `max`
    #[inline]
    #[must_use]
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self::Exponential {
            initial_ms: millis(initial),
            max_ms: millis(max),
        }
    }

    /// Delay after the given number of consecutive failures (1-based)
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        match *self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { initial_ms, max_ms } => {
                let shift = failures.saturating_sub(1).min(32);
                let scaled = initial_ms.saturating_mul(1u64 << shift);
                Duration::from_millis(scaled.min(max_ms.max(initial_ms)))
            }
        }
    }

    /// Smallest delay this policy will ever produce
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        match *self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { initial_ms, .. } => Duration::from_millis(initial_ms),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
