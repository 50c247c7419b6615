//! Core components of the keybucket rate limiting library
//!
//! - [`bucket`]: per-key token state and lazy refill arithmetic
//! - [`bucket_store`]: the [`BucketStore`] decision procedure
//! - [`clock`]: time sources
//! - [`rate`]: refill interval construction
//! - [`store`]: concurrent key → bucket containers

pub mod bucket;
pub mod bucket_store;
pub mod clock;
mod eviction;
pub mod rate;
pub mod store;

pub use bucket::{Bucket, Limits};
pub use bucket_store::{BucketStore, BucketStoreBuilder, Decision};
pub use clock::{Clock, ManualClock, SystemClock};
pub use rate::Rate;
#[cfg(feature = "dashmap")]
pub use store::DashBucketMap;
pub use store::{BucketMap, ShardedMap};

/// Errors reported by the bucket store
///
/// Configuration variants are returned when a store or map is built; they are
/// never produced by [`BucketStore::try_consume`].
///
/// # Example
///
/// ```
/// use keybucket::{BucketError, BucketStore, ManualClock};
///
/// let result = BucketStore::new(ManualClock::new(0), 0, 1000);
/// assert!(matches!(result, Err(BucketError::InvalidCapacity(0))));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BucketError {
    /// Capacity must be at least one token
    #[error("invalid capacity: {0} (must be at least 1)")]
    InvalidCapacity(u64),

    /// Refill interval must be at least one millisecond
    #[error("invalid refill interval: {0}ms (must be at least 1ms)")]
    InvalidRefillInterval(u128),

    /// Shard count rejected by the chosen bucket map
    #[error("invalid shard count: {0}")]
    InvalidShardCount(usize),

    /// A request asked for more tokens than a bucket can ever hold
    #[error("quantity {quantity} exceeds bucket capacity {capacity}")]
    QuantityExceedsCapacity { quantity: u64, capacity: u64 },
}

pub type Result<T> = std::result::Result<T, BucketError>;
