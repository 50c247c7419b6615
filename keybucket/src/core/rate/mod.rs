//! Refill rate for token buckets
//!
//! This module provides the [`Rate`] type, which describes how often a bucket
//! gains one token. It converts human-friendly rate specifications
//! (e.g., "100 requests per minute") into a refill interval.

use super::BucketError;
use std::time::Duration;


/// Time between the addition of two tokens to a bucket
///
/// Buckets refill in whole milliseconds, so a `Rate` is converted to a
/// millisecond interval when a [`BucketStore`](crate::BucketStore) is built.
/// The conversion truncates: `Rate::per_second(3)` becomes 333ms, slightly
/// faster than three tokens per second. Intervals shorter than one
/// millisecond are rejected at that point.
///
/// # Examples
///
/// ```
/// use keybucket::Rate;
/// use std::time::Duration;
///
/// // 10 tokens per second
/// let rate = Rate::per_second(10);
/// assert_eq!(rate.interval(), Duration::from_millis(100));
///
/// // 60 tokens per minute (1 per second)
/// let rate = Rate::per_minute(60);
/// assert_eq!(rate.interval(), Duration::from_secs(1));
///
/// // One token every 2.5 seconds
/// let rate = Rate::new(Duration::from_millis(2500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    interval: Duration,
}

impl Rate {
    /// Creates a rate that adds one token every `interval`
    pub fn new(interval: Duration) -> Self {
        Rate { interval }
    }

    /// Creates a rate that adds one token every `millis` milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Rate::new(Duration::from_millis(millis))
    }

    /// Creates a rate of `n` tokens per second
    ///
    /// `n == 0` yields a zero interval, which the store builder rejects. The
    /// interval is truncated to whole milliseconds when the store is built.
    pub fn per_second(n: u32) -> Self {
        Self::per(Duration::from_secs(1), n)
    }

    /// Creates a rate of `n` tokens per minute
    pub fn per_minute(n: u32) -> Self {
        Self::per(Duration::from_secs(60), n)
    }

    /// Creates a rate of `n` tokens per hour
    pub fn per_hour(n: u32) -> Self {
        Self::per(Duration::from_secs(3600), n)
    }

    /// Creates a rate of `n` tokens per day
    pub fn per_day(n: u32) -> Self {
        Self::per(Duration::from_secs(86400), n)
    }

    fn per(window: Duration, n: u32) -> Self {
        Rate {
            interval: window.checked_div(n).unwrap_or(Duration::ZERO),
        }
    }

    /// Returns the time between two token additions
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whole milliseconds per token, rejecting sub-millisecond intervals
    pub(crate) fn as_millis(&self) -> Result<u64, BucketError> {
        let millis = self.interval.as_millis();
        if millis == 0 || millis > u64::MAX as u128 {
            return Err(BucketError::InvalidRefillInterval(millis));
        }
        Ok(millis as u64)
    }
}

impl From<Duration> for Rate {
    fn from(interval: Duration) -> Self {
        Rate::new(interval)
    }
}
