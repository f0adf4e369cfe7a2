//! # Receipt Clock
//!
//! Time source for the deduplication filter. All burst windows and receipt
//! timestamps are expressed in milliseconds. The filter reads the clock once
//! per accepted event, so a single event never observes two different "now"s.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A millisecond time source.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds. Must never go backwards.
    fn now_ms(&self) -> u64;
}

/// # System Clock
///
/// A monotonic clock whose readings look like Unix epoch milliseconds.
/// The wall-clock epoch offset is sampled once at construction; later
/// readings add `Instant` elapsed time, so a wall-clock step (NTP, manual
/// change) cannot move receipt timestamps backwards.
#[derive(Debug, Clone)]
pub struct SystemClock {
    base_epoch_ms: u64,
    base_instant: Instant,
}

impl SystemClock {
    /// Anchors a new clock to the current wall-clock time.
    pub fn new() -> Self {
        let base_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            base_epoch_ms,
            base_instant: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.base_epoch_ms + self.base_instant.elapsed().as_millis() as u64
    }
}

/// # Manual Clock
///
/// A hand-driven clock. Clones share the same reading, so a test can keep one
/// handle and pass another into the filter.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock that reads `start_ms` until moved.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Moves the clock forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }

    /// Sets an absolute reading.
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_epoch_like_and_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        // 2020-01-01T00:00:00Z
        assert!(a > 1_577_836_800_000);
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_clones_share_reading() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();
        handle.advance(250);
        assert_eq!(clock.now_ms(), 1_250);
        clock.set(10);
        assert_eq!(handle.now_ms(), 10);
    }
}
