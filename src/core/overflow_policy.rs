//! Overflow policies for the async logging queue
//!
//! When the bounded queue is full, the policy decides whether the producer
//! waits, evicts older records, or loses the new one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Policy for handling queue overflow in async logging
///
/// # Example
///
/// ```
/// use rust_log_engine::OverflowPolicy;
/// use std::time::Duration;
///
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::Block);
///
/// let policy: OverflowPolicy = "discard-oldest".parse().unwrap();
/// assert_eq!(policy, OverflowPolicy::DiscardOldest);
///
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// assert_eq!(policy.to_string(), "block-timeout:100ms");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OverflowPolicy {
    /// Wait until space is available
    ///
    /// Producers feel the backpressure but no record is lost.
    #[default]
    Block,

    /// Wait up to the given duration, then fail with `QueueTimeout`
    BlockWithTimeout(Duration),

    /// Evict the oldest queued records until the new one fits
    ///
    /// Evicted records are counted as dropped.
    DiscardOldest,

    /// Reject the new record with `QueueFull` and count it as dropped
    DiscardNew,
}

impl OverflowPolicy {
    /// Whether a producer may wait on a full queue under this policy
    pub fn waits(&self) -> bool {
        matches!(
            self,
            OverflowPolicy::Block | OverflowPolicy::BlockWithTimeout(_)
        )
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "block-timeout:{}ms", d.as_millis()),
            OverflowPolicy::DiscardOldest => write!(f, "discard-oldest"),
            OverflowPolicy::DiscardNew => write!(f, "discard-new"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    /// Accepts `block`, `discard-oldest`, `discard-new` and `block-timeout:<millis>[ms]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "block" => Ok(OverflowPolicy::Block),
            "discard-oldest" | "overrun-oldest" => Ok(OverflowPolicy::DiscardOldest),
            "discard-new" | "discard-newest" => Ok(OverflowPolicy::DiscardNew),
            other => {
                let millis = other
                    .strip_prefix("block-timeout:")
                    .map(|rest| rest.trim_end_matches("ms"))
                    .and_then(|rest| rest.parse::<u64>().ok())
                    .ok_or_else(|| format!("Invalid overflow policy: '{}'", s))?;
                Ok(OverflowPolicy::BlockWithTimeout(Duration::from_millis(millis)))
            }
        }
    }
}

impl TryFrom<String> for OverflowPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OverflowPolicy> for String {
    fn from(policy: OverflowPolicy) -> Self {
        policy.to_string()
    }
}
