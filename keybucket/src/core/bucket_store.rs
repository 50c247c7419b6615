//! Per-key token bucket store
//!
//! This module provides [`BucketStore`], which owns the key → bucket mapping
//! and decides for each request whether a token may be taken. Refill is lazy:
//! every call credits the tokens earned since the bucket's checkpoint, so no
//! timer ever walks the buckets.

use super::bucket::{Bucket, Limits};
use super::clock::{Clock, SystemClock};
use super::eviction::EvictionSchedule;
use super::rate::Rate;
use super::store::{BucketMap, ShardedMap};
use super::{BucketError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const DEFAULT_CAPACITY: u64 = 10;
const DEFAULT_REFILL_INTERVAL_MS: u64 = 1000;

/// Outcome of a [`BucketStore::consume`] call
///
/// # Example
///
/// ```
/// use keybucket::{BucketStore, ManualClock};
/// use std::time::Duration;
///
/// let store = BucketStore::new(ManualClock::new(0), 2, 1000).unwrap();
///
/// let decision = store.consume("user:1", 2).unwrap();
/// assert!(decision.allowed);
/// assert_eq!(decision.remaining, 0);
///
/// let decision = store.consume("user:1", 1).unwrap();
/// assert!(!decision.allowed);
/// assert_eq!(decision.retry_after, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the tokens were taken
    pub allowed: bool,
    /// Bucket capacity
    pub limit: u64,
    /// Tokens left after this decision
    pub remaining: u64,
    /// Wait before the same request can succeed (zero if allowed)
    pub retry_after: Duration,
    /// Wait until the bucket is full again
    pub reset_after: Duration,
}

impl Decision {
    fn new(allowed: bool, quantity: u64, bucket: &Bucket, limits: &Limits, now: u64) -> Self {
        let retry_after = if allowed {
            0
        } else {
            bucket.wait_for(limits, quantity, now)
        };
        Decision {
            allowed,
            limit: limits.capacity(),
            remaining: bucket.tokens(),
            retry_after: Duration::from_millis(retry_after),
            reset_after: Duration::from_millis(bucket.wait_for(limits, limits.capacity(), now)),
        }
    }
}

/// Token bucket rate limiter keyed by string
///
/// Every key owns an independent bucket holding at most `capacity` tokens.
/// A bucket is created full on first use of its key and gains one token per
/// refill interval, computed lazily at the next call for that key. The store
/// is `Sync`: share it across threads behind an `Arc` and call it directly.
///
/// Each key's refill-and-consume runs under that key's shard lock in the
/// [`BucketMap`], so concurrent calls for one key never spend the same token
/// twice, while calls for keys on other shards proceed in parallel.
///
/// # Example
///
/// ```
/// use keybucket::{BucketStore, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(0);
/// let store = BucketStore::new(clock.clone(), 2, 1000).unwrap();
///
/// assert!(store.try_consume("127.0.0.1"));
/// assert!(store.try_consume("127.0.0.1"));
/// assert!(!store.try_consume("127.0.0.1"));
///
/// clock.advance(Duration::from_secs(1));
/// assert!(store.try_consume("127.0.0.1"));
/// assert!(!store.try_consume("127.0.0.1"));
/// ```
pub struct BucketStore<C = SystemClock, M = ShardedMap> {
    map: M,
    clock: C,
    limits: Limits,
    eviction: Option<EvictionSchedule>,
    evicted: AtomicU64,
}

impl BucketStore {
    /// Create a builder with default settings
    ///
    /// Defaults: capacity 10, one token per second, system clock, sharded map,
    /// no idle eviction.
    pub fn builder() -> BucketStoreBuilder {
        BucketStoreBuilder::new()
    }
}

impl<C: Clock> BucketStore<C, ShardedMap> {
    /// Create a store with the default sharded map and no idle eviction
    ///
    /// # Parameters
    ///
    /// - `clock`: time source
    /// - `capacity`: burst size, at least 1
    /// - `refill_interval_millis`: milliseconds to earn one token, at least 1
    ///
    /// # Errors
    ///
    /// - [`BucketError::InvalidCapacity`] if `capacity == 0`
    /// - [`BucketError::InvalidRefillInterval`] if `refill_interval_millis == 0`
    pub fn new(clock: C, capacity: u64, refill_interval_millis: u64) -> Result<Self> {
        let limits = Limits::new(capacity, refill_interval_millis)?;
        Ok(Self::from_parts(ShardedMap::new(), clock, limits, None))
    }
}

impl<C: Clock, M: BucketMap> BucketStore<C, M> {
    fn from_parts(map: M, clock: C, limits: Limits, eviction_ms: Option<u64>) -> Self {
        let eviction = eviction_ms.map(|ms| EvictionSchedule::new(ms, clock.now_millis()));
        BucketStore {
            map,
            clock,
            limits,
            eviction,
            evicted: AtomicU64::new(0),
        }
    }

    /// Take one token from `key`'s bucket
    ///
    /// Returns `true` if a token was available and has been taken, `false`
    /// if the bucket is empty. A `false` leaves the bucket untouched.
    pub fn try_consume(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        let decision = self.decide(key, 1, now);
        self.maybe_evict(now);
        decision.allowed
    }

    /// Take `quantity` tokens from `key`'s bucket, all or nothing
    ///
    /// A `quantity` of zero always succeeds and reports the current state.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::QuantityExceedsCapacity`] if `quantity` is larger
    /// than the capacity, since such a request could never be admitted.
    pub fn consume(&self, key: &str, quantity: u64) -> Result<Decision> {
        if quantity > self.limits.capacity() {
            return Err(BucketError::QuantityExceedsCapacity {
                quantity,
                capacity: self.limits.capacity(),
            });
        }
        let now = self.clock.now_millis();
        let decision = self.decide(key, quantity, now);
        self.maybe_evict(now);
        Ok(decision)
    }

    /// Tokens a request for `key` would see right now
    ///
    /// Does not create a bucket for an unseen key; such a key reports the full
    /// capacity.
    pub fn available(&self, key: &str) -> u64 {
        let now = self.clock.now_millis();
        match self.map.get(key) {
            Some(mut bucket) => {
                bucket.refill(&self.limits, now);
                bucket.tokens()
            }
            None => self.limits.capacity(),
        }
    }

    fn decide(&self, key: &str, quantity: u64, now: u64) -> Decision {
        let limits = self.limits;
        self.map.with_bucket(
            key,
            || {
                #[cfg(feature = "tracing")]
                tracing::trace!(key, "creating bucket");
                Bucket::full(&limits, now)
            },
            |stored| {
                let mut bucket = *stored;
                bucket.refill(&limits, now);
                let allowed = bucket.take(quantity);
                if allowed {
                    *stored = bucket;
                }
                Decision::new(allowed, quantity, &bucket, &limits, now)
            },
        )
    }

    fn maybe_evict(&self, now: u64) {
        if let Some(schedule) = &self.eviction {
            if schedule.claim(now) {
                self.sweep(now);
            }
        }
    }

    /// Drop every bucket that has refilled to capacity
    ///
    /// A dropped key comes back as a fresh full bucket on its next call, so
    /// the tokens it can spend are the same as if it had been kept. Runs
    /// automatically when an eviction interval is configured; returns the
    /// number of dropped buckets.
    pub fn evict_idle(&self) -> usize {
        self.sweep(self.clock.now_millis())
    }

    fn sweep(&self, now: u64) -> usize {
        let limits = self.limits;
        let removed = self
            .map
            .retain(|_, bucket| !bucket.is_full_at(&limits, now));
        self.evicted.fetch_add(removed as u64, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::debug!(removed, remaining = self.map.len(), "evicted idle buckets");

        removed
    }

    /// Total buckets dropped by idle eviction since the store was built
    pub fn evicted_total(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Number of keys currently holding a bucket
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Forget every bucket
    pub fn clear(&self) {
        self.map.clear();
    }

    /// Maximum tokens per bucket
    pub fn capacity(&self) -> u64 {
        self.limits.capacity()
    }

    /// Time to earn one token
    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.limits.refill_interval_ms())
    }

    /// Interval between automatic idle sweeps, if enabled
    pub fn eviction_interval(&self) -> Option<Duration> {
        self.eviction
            .as_ref()
            .map(|schedule| Duration::from_millis(schedule.interval_ms()))
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn map(&self) -> &M {
        &self.map
    }
}

/// Builder for configuring a [`BucketStore`]
///
/// # Example
///
/// ```
/// use keybucket::{BucketStore, Rate};
/// use std::time::Duration;
///
/// let store = BucketStore::builder()
///     .capacity(50)
///     .rate(Rate::per_minute(600))
///     .shards(64)
///     .eviction_interval(Duration::from_secs(60))
///     .build()
///     .unwrap();
///
/// assert_eq!(store.refill_interval(), Duration::from_millis(100));
/// ```
pub struct BucketStoreBuilder<C = SystemClock> {
    capacity: u64,
    rate: Rate,
    shards: Option<usize>,
    eviction_interval: Option<Duration>,
    clock: C,
}

impl Default for BucketStoreBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            rate: Rate::from_millis(DEFAULT_REFILL_INTERVAL_MS),
            shards: None,
            eviction_interval: None,
            clock: SystemClock::new(),
        }
    }
}

impl BucketStoreBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> BucketStoreBuilder<C> {
    /// Set the bucket capacity (burst size)
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the time needed to earn one token
    pub fn refill_interval(mut self, interval: Duration) -> Self {
        self.rate = Rate::new(interval);
        self
    }

    /// Set the time needed to earn one token, in milliseconds
    pub fn refill_interval_millis(mut self, millis: u64) -> Self {
        self.rate = Rate::from_millis(millis);
        self
    }

    /// Set the refill rate
    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = rate;
        self
    }

    /// Set the shard count of the default [`ShardedMap`]
    ///
    /// Ignored by [`build_with`](Self::build_with).
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Sweep buckets that have refilled to capacity every `interval`
    ///
    /// The sweep runs inside whichever call first notices the interval has
    /// passed. A zero interval sweeps on every call.
    pub fn eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = Some(interval);
        self
    }

    /// Use a different time source
    pub fn clock<C2: Clock>(self, clock: C2) -> BucketStoreBuilder<C2> {
        BucketStoreBuilder {
            capacity: self.capacity,
            rate: self.rate,
            shards: self.shards,
            eviction_interval: self.eviction_interval,
            clock,
        }
    }

    /// Build a store over a [`ShardedMap`]
    ///
    /// # Errors
    ///
    /// Returns a [`BucketError`] if capacity, refill interval or shard count
    /// is invalid.
    pub fn build(self) -> Result<BucketStore<C, ShardedMap>> {
        let map = match self.shards {
            Some(shards) => ShardedMap::with_shards(shards)?,
            None => ShardedMap::new(),
        };
        self.build_with(map)
    }

    /// Build a store over the given bucket map
    pub fn build_with<M: BucketMap>(self, map: M) -> Result<BucketStore<C, M>> {
        let limits = Limits::new(self.capacity, self.rate.as_millis()?)?;
        let eviction_ms = self
            .eviction_interval
            .map(|interval| interval.as_millis().min(u64::MAX as u128) as u64);
        Ok(BucketStore::from_parts(map, self.clock, limits, eviction_ms))
    }
}
