//! Per-key bucket state and the lazy refill arithmetic
//!
//! A [`Bucket`] is a plain `Copy` value. The store works on a copy inside the
//! key's critical section and writes it back only when tokens were actually
//! taken, so a denied request never changes what is stored.

use super::BucketError;

/// Immutable limits shared by every bucket of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    capacity: u64,
    refill_interval_ms: u64,
}

impl Limits {
    /// Validate and build limits
    ///
    /// # Errors
    ///
    /// - [`BucketError::InvalidCapacity`] if `capacity == 0`
    /// - [`BucketError::InvalidRefillInterval`] if `refill_interval_ms == 0`
    pub fn new(capacity: u64, refill_interval_ms: u64) -> Result<Self, BucketError> {
        if capacity == 0 {
            return Err(BucketError::InvalidCapacity(capacity));
        }
        if refill_interval_ms == 0 {
            return Err(BucketError::InvalidRefillInterval(0));
        }
        Ok(Limits {
            capacity,
            refill_interval_ms,
        })
    }

    /// Maximum tokens a bucket holds (the burst size)
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Milliseconds needed to earn one token
    pub fn refill_interval_ms(&self) -> u64 {
        self.refill_interval_ms
    }
}

/// Token count and refill checkpoint for a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    tokens: u64,
    last_refill: u64,
}

impl Bucket {
    /// A bucket holding `limits.capacity()` tokens with its checkpoint at `now`
    pub fn full(limits: &Limits, now: u64) -> Self {
        Bucket {
            tokens: limits.capacity,
            last_refill: now,
        }
    }

    /// Tokens available as of the last refill
    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    /// Timestamp up to which accrual has been credited
    pub fn last_refill(&self) -> u64 {
        self.last_refill
    }

    /// Credit every whole token earned since the checkpoint
    ///
    /// The checkpoint moves by exactly `earned * interval`, so partial
    /// progress toward the next token carries over to the next call. Tokens
    /// beyond capacity are dropped. A clock reading earlier than the
    /// checkpoint counts as no elapsed time.
    pub fn refill(&mut self, limits: &Limits, now: u64) {
        let elapsed = now.saturating_sub(self.last_refill);
        let earned = elapsed / limits.refill_interval_ms;
        if earned == 0 {
            return;
        }

        // earned * interval <= elapsed, so this cannot overflow
        self.last_refill += earned * limits.refill_interval_ms;
        self.tokens = self.tokens.saturating_add(earned).min(limits.capacity);
    }

    /// Take `quantity` tokens if they are all available
    pub fn take(&mut self, quantity: u64) -> bool {
        if self.tokens < quantity {
            return false;
        }
        self.tokens -= quantity;
        true
    }

    /// Milliseconds of progress toward the next token
    pub fn partial_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_refill)
    }

    /// Whether a refill at `now` would bring the bucket to capacity
    pub fn is_full_at(&self, limits: &Limits, now: u64) -> bool {
        let mut probe = *self;
        probe.refill(limits, now);
        probe.tokens == limits.capacity
    }

    /// Milliseconds until `quantity` tokens will be available
    ///
    /// Assumes the bucket was refilled at `now`. Returns 0 if the tokens are
    /// already there.
    pub fn wait_for(&self, limits: &Limits, quantity: u64, now: u64) -> u64 {
        if self.tokens >= quantity {
            return 0;
        }
        let missing = quantity - self.tokens;
        missing
            .saturating_mul(limits.refill_interval_ms)
            .saturating_sub(self.partial_ms(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(capacity: u64, interval: u64) -> Limits {
        Limits::new(capacity, interval).unwrap()
    }

    #[test]
    fn test_limits_reject_zero() {
        assert!(matches!(
            Limits::new(0, 1000),
            Err(BucketError::InvalidCapacity(0))
        ));
        assert!(matches!(
            Limits::new(5, 0),
            Err(BucketError::InvalidRefillInterval(0))
        ));
        assert!(Limits::new(1, 1).is_ok());
    }

    #[test]
    fn test_refill_carries_remainder() {
        let limits = limits(2, 1000);
        let mut bucket = Bucket::full(&limits, 0);
        assert!(bucket.take(2));

        bucket.refill(&limits, 1900);
        assert_eq!(bucket.tokens(), 1);
        assert_eq!(bucket.last_refill(), 1000);
        assert_eq!(bucket.partial_ms(1900), 900);

        // The 900ms already accrued count toward the next token
        bucket.refill(&limits, 2000);
        assert_eq!(bucket.tokens(), 2);
        assert_eq!(bucket.last_refill(), 2000);
    }

    #[test]
    fn test_refill_caps_at_capacity() {
        let limits = limits(3, 10);
        let mut bucket = Bucket::full(&limits, 0);
        assert!(bucket.take(3));

        bucket.refill(&limits, 10 * 1000);
        assert_eq!(bucket.tokens(), 3);
    }

    #[test]
    fn test_refill_ignores_backwards_clock() {
        let limits = limits(1, 100);
        let mut bucket = Bucket::full(&limits, 5000);
        assert!(bucket.take(1));

        bucket.refill(&limits, 1000);
        assert_eq!(bucket.tokens(), 0);
        assert_eq!(bucket.last_refill(), 5000);
    }

    #[test]
    fn test_take_is_all_or_nothing() {
        let limits = limits(5, 100);
        let mut bucket = Bucket::full(&limits, 0);

        assert!(!bucket.take(6));
        assert_eq!(bucket.tokens(), 5);
        assert!(bucket.take(5));
        assert!(!bucket.take(1));
        assert!(bucket.take(0));
    }

    #[test]
    fn test_wait_for() {
        let limits = limits(4, 1000);
        let mut bucket = Bucket::full(&limits, 0);
        assert!(bucket.take(4));

        bucket.refill(&limits, 250);
        assert_eq!(bucket.wait_for(&limits, 1, 250), 750);
        assert_eq!(bucket.wait_for(&limits, 3, 250), 2750);

        bucket.refill(&limits, 1250);
        assert_eq!(bucket.wait_for(&limits, 1, 1250), 0);
    }

    #[test]
    fn test_is_full_at() {
        let limits = limits(2, 1000);
        let mut bucket = Bucket::full(&limits, 0);
        assert!(bucket.is_full_at(&limits, 0));

        assert!(bucket.take(2));
        assert!(!bucket.is_full_at(&limits, 1999));
        assert!(bucket.is_full_at(&limits, 2000));
    }
}
