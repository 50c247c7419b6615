//! # keybucket
//!
//! A per-key token bucket rate limiter for Rust.
//!
//! ## Overview
//!
//! Every key (a client address, an API key, a user id) owns an independent
//! bucket of tokens:
//! - **Burst bound**: a bucket holds at most `capacity` tokens
//! - **Steady rate**: one token is earned per refill interval
//! - **Lazy refill**: tokens are credited when a key is checked, never by a timer
//! - **Concurrent**: per-shard locking, no global lock, no lost updates
//!
//! ## Quick Start
//!
//! ```
//! use keybucket::{BucketStore, SystemClock};
//!
//! // Burst of 10, then one request every 100ms per key
//! let store = BucketStore::new(SystemClock::new(), 10, 100).unwrap();
//!
//! if store.try_consume("user:123") {
//!     println!("Request allowed");
//! } else {
//!     println!("Rate limited");
//! }
//! ```
//!
//! ## Deterministic time
//!
//! The store reads time only through a [`Clock`]. Tests hand it a
//! [`ManualClock`] and move time explicitly:
//!
//! ```
//! use keybucket::{BucketStore, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new(0);
//! let store = BucketStore::new(clock.clone(), 2, 1000).unwrap();
//!
//! assert!(store.try_consume("10.0.0.1"));
//! assert!(store.try_consume("10.0.0.1"));
//! assert!(!store.try_consume("10.0.0.1"));
//!
//! clock.advance(Duration::from_millis(2500));
//! assert!(store.try_consume("10.0.0.1"));
//! assert!(store.try_consume("10.0.0.1"));
//! assert!(!store.try_consume("10.0.0.1"));
//! ```
//!
//! ## Detailed decisions
//!
//! [`BucketStore::consume`] takes several tokens at once and reports what is
//! left and how long to wait:
//!
//! ```
//! use keybucket::{BucketStore, ManualClock};
//!
//! let store = BucketStore::new(ManualClock::new(0), 5, 200).unwrap();
//!
//! let decision = store.consume("upload:42", 3)?;
//! assert!(decision.allowed);
//! assert_eq!(decision.remaining, 2);
//! # Ok::<(), keybucket::BucketError>(())
//! ```
//!
//! ## Sharing across threads
//!
//! [`BucketStore`] is `Send + Sync`; wrap it in an `Arc`, no mutex needed:
//!
//! ```
//! use keybucket::{BucketStore, SystemClock};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let store = Arc::new(BucketStore::new(SystemClock::new(), 100, 10).unwrap());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|i| {
//!         let store = Arc::clone(&store);
//!         thread::spawn(move || store.try_consume(&format!("worker:{i}")))
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     assert!(handle.join().unwrap());
//! }
//! ```
//!
//! ## Memory growth
//!
//! Buckets are created on first use and kept until removed. Enable idle
//! eviction to drop buckets that have refilled to capacity:
//!
//! ```
//! use keybucket::BucketStore;
//! use std::time::Duration;
//!
//! let store = BucketStore::builder()
//!     .capacity(20)
//!     .refill_interval(Duration::from_millis(500))
//!     .eviction_interval(Duration::from_secs(60))
//!     .build()
//!     .unwrap();
//! ```
//!
//! Keys are not validated; callers exposed to untrusted input should bound
//! or normalize them before calling in.
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for shard selection and shard maps
//! - `dashmap` (default): Provide [`DashBucketMap`]
//! - `tracing`: Emit events for bucket creation and eviction sweeps

pub mod core;

#[cfg(feature = "dashmap")]
pub use crate::core::DashBucketMap;
pub use crate::core::{
    Bucket, BucketError, BucketMap, BucketStore, BucketStoreBuilder, Clock, Decision, Limits,
    ManualClock, Rate, Result, ShardedMap, SystemClock,
};

