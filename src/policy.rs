//! Reconnect decision after an unexpected stream termination.

use std::time::Duration;

use enum_as_inner::EnumAsInner;

/// Delay before the first retry
pub const BASE_DELAY: Duration = Duration::from_secs(1);
/// Upper bound of any retry delay
pub const DELAY_CAP: Duration = Duration::from_secs(30);
/// Consecutive failures allowed before giving up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// What to do after the stream broke
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumAsInner)]
pub enum Decision {
    /// Open the stream again after the delay
    RetryAfter(Duration),
    /// Stop, until someone calls `open` explicitly
    GiveUp,
}

/// Exponential backoff with a ceiling on both delay and attempt count.
///
/// It holds only constants, the attempt counter lives in the connection manager.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// delay of attempt 0
    pub base_delay: Duration,
    /// max delay of any attempt
    pub delay_cap: Duration,
    /// give up when attempt reach this value
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: BASE_DELAY,
            delay_cap: DELAY_CAP,
            max_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Decide for `attempt`, the 0-indexed count of consecutive failures since last success.
    pub fn decide(&self, attempt: u32) -> Decision {
        if attempt >= self.max_attempts {
            return Decision::GiveUp;
        }

        Decision::RetryAfter(self.delay(attempt))
    }

    /// `min(base * 2^attempt, cap)`, saturating
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.delay_cap)
            .min(self.delay_cap)
    }
}
