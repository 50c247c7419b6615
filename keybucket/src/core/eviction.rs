use std::sync::atomic::{AtomicU64, Ordering};

/// Deadline bookkeeping for lazy idle-bucket sweeps
///
/// There is no background task. Callers check [`claim`](Self::claim) after a
/// decision; the one caller whose compare-and-swap moves the deadline forward
/// runs the sweep, everyone else returns immediately.
#[derive(Debug)]
pub(crate) struct EvictionSchedule {
    interval_ms: u64,
    next_sweep: AtomicU64,
}

impl EvictionSchedule {
    pub(crate) fn new(interval_ms: u64, now: u64) -> Self {
        EvictionSchedule {
            interval_ms,
            next_sweep: AtomicU64::new(now.saturating_add(interval_ms)),
        }
    }

    pub(crate) fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Returns true for exactly one caller once the deadline has passed
    pub(crate) fn claim(&self, now: u64) -> bool {
        let next = self.next_sweep.load(Ordering::Acquire);
        if now < next {
            return false;
        }
        self.next_sweep
            .compare_exchange(
                next,
                now.saturating_add(self.interval_ms),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}
