//! How long to wait after a recoverable client failure.

use std::time::Duration;

use crate::config::LoopSettings;
use crate::error::ClientError;
use crate::state::LoopState;

/// Recoverable failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connectivity or server trouble; retry soon
    Transient,
    /// The API asked us to slow down
    RateLimited,
}

pub fn classify(err: &ClientError) -> FailureClass {
    if err.is_rate_limit() {
        FailureClass::RateLimited
    } else {
        FailureClass::Transient
    }
}

/// Wait durations applied by the reply loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub retry_delay: Duration,
    pub rate_limit_default: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(2),
            rate_limit_default: Duration::from_secs(60),
        }
    }
}

impl From<&LoopSettings> for BackoffPolicy {
    fn from(settings: &LoopSettings) -> Self {
        Self {
            retry_delay: settings.retry_delay(),
            rate_limit_default: settings.rate_limit_default(),
        }
    }
}

impl BackoffPolicy {
    /// Waiting state and duration for `err`.
    ///
    /// Rate limits use the API's numeric hint when present, then the hint in
    /// the message text, then the default.
    pub fn wait_for(&self, err: &ClientError) -> (LoopState, Duration) {
        match classify(err) {
            FailureClass::Transient => (LoopState::RetryWait, self.retry_delay),
            FailureClass::RateLimited => {
                let wait = err
                    .retry_after()
                    .or_else(|| parse_rate_limit_hint(&err.to_string()))
                    .unwrap_or(self.rate_limit_default);
                (LoopState::RateLimitWait, wait)
            }
        }
    }
}

/// Read the wait hint out of a message like "try again in 5 minutes".
///
/// Only the single character two positions before the first `minutes` is
/// considered; it must be a decimal digit `d`, giving `(d + 1) * 60` seconds.
pub fn parse_rate_limit_hint(message: &str) -> Option<Duration> {
    let pos = message.find("minutes")?;
    let digit = message[..pos].chars().rev().nth(1)?.to_digit(10)?;
    Some(Duration::from_secs((u64::from(digit) + 1) * 60))
}
