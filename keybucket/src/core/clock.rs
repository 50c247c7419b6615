//! Time sources for the bucket store
//!
//! The store never reads the system time directly. Every decision is made
//! against a [`Clock`], which makes refill behavior a pure function of elapsed
//! milliseconds and lets tests drive time by hand with [`ManualClock`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A source of monotonically non-decreasing millisecond timestamps
///
/// The origin is arbitrary; only differences between readings matter.
/// Implementations must be safe to read from many threads at once.
///
/// # Example
///
/// ```
/// use keybucket::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// assert_eq!(clock.now_millis(), 1_000);
/// ```
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the clock's origin
    fn now_millis(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// Production clock backed by [`Instant`]
///
/// Readings are milliseconds elapsed since the clock was created, so they are
/// monotonic even if the wall clock is adjusted.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // u64 milliseconds covers ~584 million years of uptime
        self.origin.elapsed().as_millis() as u64
    }
}

/// A hand-driven clock for tests and simulations
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the store.
///
/// # Example
///
/// ```
/// use keybucket::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(0);
/// let handle = clock.clone();
///
/// handle.advance(Duration::from_millis(1500));
/// assert_eq!(clock.now_millis(), 1500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `start` milliseconds
    pub fn new(start: u64) -> Self {
        ManualClock {
            millis: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Move the clock forward by `by`, truncated to whole milliseconds
    pub fn advance(&self, by: Duration) {
        self.advance_millis(by.as_millis() as u64);
    }

    /// Move the clock forward by `millis`
    pub fn advance_millis(&self, millis: u64) {
        let _ = self
            .millis
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(millis))
            });
    }

    /// Set the absolute reading
    ///
    /// Setting an earlier time is allowed; the store treats a backwards step
    /// as zero elapsed time.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }
}
