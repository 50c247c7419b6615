//! Concurrent key → bucket containers
//!
//! A [`BucketMap`] is the only shared mutable state of a
//! [`BucketStore`](crate::BucketStore). Implementations must give each key an
//! exclusive critical section for its read-modify-write, create a key's bucket
//! exactly once, and never hold one lock over the whole map while doing so.

use super::bucket::Bucket;

#[cfg(feature = "dashmap")]
mod dash;
mod sharded;

#[cfg(feature = "dashmap")]
pub use dash::DashBucketMap;
pub use sharded::ShardedMap;

#[cfg(test)]
mod tests;

/// Storage backend for per-key buckets
pub trait BucketMap: Send + Sync {
    /// Run `f` with exclusive access to the bucket for `key`
    ///
    /// If the key is not present, `init` builds its bucket first. Concurrent
    /// first calls for the same key run `init` once between them; the others
    /// observe the inserted bucket.
    fn with_bucket<I, F, R>(&self, key: &str, init: I, f: F) -> R
    where
        I: FnOnce() -> Bucket,
        F: FnOnce(&mut Bucket) -> R;

    /// Snapshot of the bucket for `key`, if one exists
    fn get(&self, key: &str) -> Option<Bucket>;

    /// Remove every bucket for which `keep` returns false
    ///
    /// Returns the number of removed buckets.
    fn retain<F>(&self, keep: F) -> usize
    where
        F: FnMut(&str, &Bucket) -> bool;

    /// Number of tracked keys
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every bucket
    fn clear(&self);
}
