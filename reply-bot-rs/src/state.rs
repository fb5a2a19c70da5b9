use std::fmt;

/// Where the reply loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Consuming the comment stream
    #[default]
    Streaming,
    /// Sleeping after a transient client failure
    RetryWait,
    /// Sleeping after a rate-limit signal
    RateLimitWait,
    /// Stopped by cancellation
    Terminated,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Streaming => "streaming",
            LoopState::RetryWait => "retry_wait",
            LoopState::RateLimitWait => "rate_limit_wait",
            LoopState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Counters accumulated over the lifetime of the loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Comments pulled from the stream
    pub comments_seen: u64,
    pub replies_sent: u64,
    pub skipped_blocked: u64,
    pub skipped_replied: u64,
    pub skipped_no_trigger: u64,
    pub transient_failures: u64,
    pub rate_limits: u64,
    /// Number of times the stream was (re)opened
    pub subscriptions: u64,
}

impl LoopStats {
    pub fn skipped(&self) -> u64 {
        self.skipped_blocked + self.skipped_replied + self.skipped_no_trigger
    }
}
