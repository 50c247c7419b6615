use super::BucketMap;
use crate::core::BucketError;
use crate::core::bucket::Bucket;
use dashmap::DashMap;

#[cfg(feature = "ahash")]
use ahash::RandomState;
#[cfg(not(feature = "ahash"))]
use std::collections::hash_map::RandomState;

/// Bucket map backed by [`DashMap`]
///
/// DashMap shards internally with read-write locks; `with_bucket` holds the
/// write guard of the key's entry while the store refills and consumes.
pub struct DashBucketMap {
    map: DashMap<String, Bucket, RandomState>,
}

impl DashBucketMap {
    /// Create a map with DashMap's default shard amount
    pub fn new() -> Self {
        DashBucketMap {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Create a map with an explicit shard amount
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::InvalidShardCount`] unless `shards` is a power
    /// of two greater than one.
    pub fn with_shard_amount(shards: usize) -> Result<Self, BucketError> {
        if shards <= 1 || !shards.is_power_of_two() {
            return Err(BucketError::InvalidShardCount(shards));
        }
        Ok(DashBucketMap {
            map: DashMap::with_hasher_and_shard_amount(RandomState::new(), shards),
        })
    }
}

impl Default for DashBucketMap {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketMap for DashBucketMap {
    fn with_bucket<I, F, R>(&self, key: &str, init: I, f: F) -> R
    where
        I: FnOnce() -> Bucket,
        F: FnOnce(&mut Bucket) -> R,
    {
        if let Some(mut bucket) = self.map.get_mut(key) {
            return f(bucket.value_mut());
        }
        let mut bucket = self.map.entry(key.to_owned()).or_insert_with(init);
        f(bucket.value_mut())
    }

    fn get(&self, key: &str) -> Option<Bucket> {
        self.map.get(key).map(|bucket| *bucket.value())
    }

    fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&str, &Bucket) -> bool,
    {
        let mut removed = 0;
        self.map.retain(|key, bucket| {
            let kept = keep(key.as_str(), &*bucket);
            if !kept {
                removed += 1;
            }
            kept
        });
        removed
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&self) {
        self.map.clear();
    }
}
