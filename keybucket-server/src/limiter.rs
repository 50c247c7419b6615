//! Limiter factory
//!
//! Builds the [`BucketStore`] selected by configuration. The two backends
//! produce different store types, so they are wrapped in [`Limiter`] and
//! dispatched by `match`.
//!
//! ## Sharded
//! - Fixed array of mutex-guarded hash maps
//! - Shard count defaults to four per core, rounded up to a power of two
//!
//! ## DashMap
//! - Lock-striped concurrent map from the `dashmap` crate
//! - Shard count must be a power of two greater than one

use crate::config::{BackendType, LimiterConfig};
use keybucket::{BucketStore, Clock, DashBucketMap, Decision, ShardedMap, SystemClock};
use std::time::Duration;

/// A bucket store over one of the supported map backends
pub enum Limiter<C = SystemClock> {
    Sharded(BucketStore<C, ShardedMap>),
    Dash(BucketStore<C, DashBucketMap>),
}

impl Limiter {
    /// Build the configured limiter on the system clock
    pub fn from_config(config: &LimiterConfig) -> keybucket::Result<Self> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> Limiter<C> {
    /// Build the configured limiter on the given clock
    ///
    /// # Errors
    ///
    /// Returns a [`keybucket::BucketError`] if the capacity, refill interval or
    /// shard count is rejected by the store.
    pub fn with_clock(config: &LimiterConfig, clock: C) -> keybucket::Result<Self> {
        let mut builder = BucketStore::builder()
            .capacity(config.capacity)
            .refill_interval_millis(config.refill_interval_ms)
            .clock(clock);

        if config.eviction_interval > 0 {
            builder = builder.eviction_interval(Duration::from_secs(config.eviction_interval));
        }

        match config.backend {
            BackendType::Sharded => {
                if let Some(shards) = config.shards {
                    builder = builder.shards(shards);
                }
                Ok(Limiter::Sharded(builder.build()?))
            }
            BackendType::Dashmap => {
                let map = match config.shards {
                    Some(shards) => DashBucketMap::with_shard_amount(shards)?,
                    None => DashBucketMap::new(),
                };
                Ok(Limiter::Dash(builder.build_with(map)?))
            }
        }
    }

    /// Take `quantity` tokens from `key`'s bucket
    pub fn consume(&self, key: &str, quantity: u64) -> keybucket::Result<Decision> {
        match self {
            Limiter::Sharded(store) => store.consume(key, quantity),
            Limiter::Dash(store) => store.consume(key, quantity),
        }
    }

    /// Number of keys currently holding a bucket
    pub fn len(&self) -> usize {
        match self {
            Limiter::Sharded(store) => store.len(),
            Limiter::Dash(store) => store.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buckets dropped by idle eviction so far
    pub fn evicted_total(&self) -> u64 {
        match self {
            Limiter::Sharded(store) => store.evicted_total(),
            Limiter::Dash(store) => store.evicted_total(),
        }
    }

    pub fn capacity(&self) -> u64 {
        match self {
            Limiter::Sharded(store) => store.capacity(),
            Limiter::Dash(store) => store.capacity(),
        }
    }

    pub fn refill_interval(&self) -> Duration {
        match self {
            Limiter::Sharded(store) => store.refill_interval(),
            Limiter::Dash(store) => store.refill_interval(),
        }
    }

    pub fn backend(&self) -> BackendType {
        match self {
            Limiter::Sharded(_) => BackendType::Sharded,
            Limiter::Dash(_) => BackendType::Dashmap,
        }
    }
}
