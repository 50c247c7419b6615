use super::{BucketMap, ShardedMap};
use crate::BucketError;
use crate::core::bucket::{Bucket, Limits};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[cfg(feature = "dashmap")]
use super::DashBucketMap;

fn limits() -> Limits {
    Limits::new(5, 1000).unwrap()
}

fn creates_once<M: BucketMap>(map: M) {
    let limits = limits();
    let inits = AtomicUsize::new(0);
    let init = || {
        inits.fetch_add(1, Ordering::SeqCst);
        Bucket::full(&limits, 0)
    };

    let tokens = map.with_bucket("k", init, |bucket| {
        assert!(bucket.take(1));
        bucket.tokens()
    });
    assert_eq!(tokens, 4);

    let tokens = map.with_bucket("k", init, |bucket| bucket.tokens());
    assert_eq!(tokens, 4);
    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("k").map(|b| b.tokens()), Some(4));
    assert_eq!(map.get("missing"), None);
}

fn retain_and_clear<M: BucketMap>(map: M) {
    let limits = limits();
    for i in 0..100 {
        map.with_bucket(&format!("key_{i}"), || Bucket::full(&limits, i), |_| ());
    }
    assert_eq!(map.len(), 100);

    // Drop the buckets created at an even timestamp
    let removed = map.retain(|_, bucket| bucket.last_refill() % 2 == 1);
    assert_eq!(removed, 50);
    assert_eq!(map.len(), 50);
    assert!(map.get("key_1").is_some());
    assert!(map.get("key_2").is_none());

    map.clear();
    assert!(map.is_empty());
}

fn concurrent_first_touch<M: BucketMap + 'static>(map: M) {
    const THREADS: usize = 16;
    let map = Arc::new(map);
    let inits = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let map = Arc::clone(&map);
            let inits = Arc::clone(&inits);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let limits = Limits::new(THREADS as u64, 1000).unwrap();
                barrier.wait();
                map.with_bucket(
                    "fresh",
                    || {
                        inits.fetch_add(1, Ordering::SeqCst);
                        Bucket::full(&limits, 0)
                    },
                    |bucket| bucket.take(1),
                )
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }

    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert_eq!(map.get("fresh").map(|b| b.tokens()), Some(0));
}

#[test]
fn test_sharded_creates_once() {
    creates_once(ShardedMap::new());
}

#[test]
fn test_sharded_retain_and_clear() {
    retain_and_clear(ShardedMap::with_shards(4).unwrap());
}

#[test]
fn test_sharded_concurrent_first_touch() {
    concurrent_first_touch(ShardedMap::with_shards(8).unwrap());
}

#[test]
fn test_sharded_shard_count() {
    assert_eq!(ShardedMap::with_shards(1).unwrap().shard_count(), 1);
    assert_eq!(ShardedMap::with_shards(5).unwrap().shard_count(), 8);
    assert!(ShardedMap::new().shard_count().is_power_of_two());
    assert!(matches!(
        ShardedMap::with_shards(0),
        Err(BucketError::InvalidShardCount(0))
    ));
}

#[test]
fn test_sharded_shard_count_overflow() {
    // No power of two above these fits in usize
    for shards in [usize::MAX, (usize::MAX >> 1) + 2] {
        assert!(matches!(
            ShardedMap::with_shards(shards),
            Err(BucketError::InvalidShardCount(n)) if n == shards
        ));
    }
}

#[cfg(feature = "dashmap")]
#[test]
fn test_dash_creates_once() {
    creates_once(DashBucketMap::new());
}

#[cfg(feature = "dashmap")]
#[test]
fn test_dash_retain_and_clear() {
    retain_and_clear(DashBucketMap::with_shard_amount(4).unwrap());
}

#[cfg(feature = "dashmap")]
#[test]
fn test_dash_concurrent_first_touch() {
    concurrent_first_touch(DashBucketMap::new());
}

#[cfg(feature = "dashmap")]
#[test]
fn test_dash_shard_amount_validation() {
    assert!(DashBucketMap::with_shard_amount(0).is_err());
    assert!(DashBucketMap::with_shard_amount(1).is_err());
    assert!(DashBucketMap::with_shard_amount(6).is_err());
    assert!(DashBucketMap::with_shard_amount(32).is_ok());
}
