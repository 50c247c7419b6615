use super::BucketMap;
use crate::core::BucketError;
use crate::core::bucket::Bucket;
use parking_lot::Mutex;

#[cfg(feature = "ahash")]
use ahash::{AHashMap as HashMap, RandomState};
#[cfg(not(feature = "ahash"))]
use std::{
    collections::{HashMap, hash_map::RandomState},
    hash::BuildHasher,
};

// Shards per available CPU
const SHARDS_PER_CPU: usize = 4;
const FALLBACK_PARALLELISM: usize = 4;
const FALLBACK_SHARDS: usize = 64;

/// Bucket map partitioned into independently locked shards
///
/// Each key hashes to one shard; a call for that key holds only that shard's
/// lock for the duration of its refill-and-consume. Keys on different shards
/// never contend, and keys that share a shard wait only for each other's
/// short critical section.
///
/// # Example
///
/// ```
/// use keybucket::{BucketStore, ManualClock, ShardedMap};
///
/// let map = ShardedMap::with_shards(16).unwrap();
/// let store = BucketStore::builder()
///     .capacity(10)
///     .refill_interval_millis(100)
///     .clock(ManualClock::new(0))
///     .build_with(map)
///     .unwrap();
///
/// assert!(store.try_consume("client-a"));
/// ```
pub struct ShardedMap {
    shards: Box<[Mutex<HashMap<String, Bucket>>]>,
    hasher: RandomState,
    mask: usize,
}

impl ShardedMap {
    /// Create a map with `4 × available_parallelism` shards, rounded up to a power of two
    pub fn new() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(FALLBACK_PARALLELISM);
        let shards = cpus.saturating_mul(SHARDS_PER_CPU);
        Self::build(shards.checked_next_power_of_two().unwrap_or(FALLBACK_SHARDS))
    }

    /// Create a map with at least `shards` shards
    ///
    /// The count is rounded up to the next power of two.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::InvalidShardCount`] if `shards == 0` or if
    /// rounding up to a power of two overflows `usize`.
    pub fn with_shards(shards: usize) -> Result<Self, BucketError> {
        match shards.checked_next_power_of_two() {
            Some(count) if shards > 0 => Ok(Self::build(count)),
            _ => Err(BucketError::InvalidShardCount(shards)),
        }
    }

    fn build(count: usize) -> Self {
        let shards = (0..count)
            .map(|_| Mutex::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        ShardedMap {
            shards,
            hasher: RandomState::new(),
            mask: count - 1,
        }
    }

    /// Number of shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, key: &str) -> &Mutex<HashMap<String, Bucket>> {
        let hash = self.hasher.hash_one(key) as usize;
        &self.shards[hash & self.mask]
    }
}

impl Default for ShardedMap {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketMap for ShardedMap {
    fn with_bucket<I, F, R>(&self, key: &str, init: I, f: F) -> R
    where
        I: FnOnce() -> Bucket,
        F: FnOnce(&mut Bucket) -> R,
    {
        let mut shard = self.shard(key).lock();
        if let Some(bucket) = shard.get_mut(key) {
            return f(bucket);
        }
        // Insert under the same lock so a key is created exactly once
        let bucket = shard.entry(key.to_owned()).or_insert_with(init);
        f(bucket)
    }

    fn get(&self, key: &str) -> Option<Bucket> {
        self.shard(key).lock().get(key).copied()
    }

    fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&str, &Bucket) -> bool,
    {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut shard = shard.lock();
            let before = shard.len();
            shard.retain(|key, bucket| keep(key.as_str(), &*bucket));
            removed += before - shard.len();
        }
        removed
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    fn clear(&self) {
        for shard in self.shards.iter() {
            shard.lock().clear();
        }
    }
}
