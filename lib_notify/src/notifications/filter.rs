//! # Deduplication & Retention Filter
//!
//! Turns each inbound `Event` into zero or one `Notification`.
//!
//! ## Rules, in order:
//! 1. **Identity**: external token, else a derived key (see `identity`).
//! 2. **Exact duplicates**: an identity already in the identity cache is
//!    rejected and nothing else changes.
//! 3. **Bursts**: an event whose similarity key was accepted less than
//!    `burst_window_ms` ago is rejected.
//! 4. **Acceptance**: the identity is cached, the burst entry refreshed, stale
//!    burst entries purged, and the notification prepended to the retained
//!    log, which is truncated to `log_capacity`.
//!
//! All bounds are fixed trims, not LRU or TTL structures: the identity cache
//! is batch-trimmed to its newest `identity_trim_to` entries once it grows
//! past `identity_capacity`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::identity::{render_message, resolve_identity, similarity_key};
use super::model::{Event, Notification};
use crate::clock::{Clock, SystemClock};

/// Bounds for the filter. Defaults are the production values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub log_capacity: usize,
    pub identity_capacity: usize,
    pub identity_trim_to: usize,
    pub burst_window_ms: u64,
    pub burst_retention_ms: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            log_capacity: 50,
            identity_capacity: 100,
            identity_trim_to: 50,
            burst_window_ms: 5_000,
            burst_retention_ms: 10_000,
        }
    }
}

/// Outcome of classifying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Accepted,
    Duplicate,
    /// Carries the milliseconds since the previous acceptance of the key.
    Burst(u64),
}

/// Insertion-ordered set of seen identities.
#[derive(Debug, Default)]
struct IdentityCache {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl IdentityCache {
    fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    fn insert(&mut self, id: String, capacity: usize, trim_to: usize) {
        if !self.members.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);

        if self.order.len() > capacity {
            let excess = self.order.len() - trim_to;
            for old in self.order.drain(..excess) {
                self.members.remove(&old);
            }
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

pub struct DedupFilter {
    config: FilterConfig,
    clock: Arc<dyn Clock>,
    seen: IdentityCache,
    bursts: HashMap<String, u64>,
    /// Newest first.
    log: VecDeque<Arc<Notification>>,
    latest: Option<Arc<Notification>>,
}

impl DedupFilter {
    /// Creates a filter with default bounds on the system clock.
    pub fn new() -> Self {
        Self::with_clock(FilterConfig::default(), Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: FilterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            seen: IdentityCache::default(),
            bursts: HashMap::new(),
            log: VecDeque::with_capacity(config.log_capacity),
            latest: None,
        }
    }

    /// Runs one event through the filter.
    ///
    /// Returns the new notification when accepted; `None` for duplicates and
    /// bursts. The clock is read exactly once.
    pub fn accept(&mut self, event: Event) -> Option<Arc<Notification>> {
        let now = self.clock.now_ms();
        let id = resolve_identity(&event, now);
        let key = similarity_key(&event);

        match self.classify(&id, &key, now) {
            Verdict::Accepted => {}
            Verdict::Duplicate => {
                log::debug!("Dropping duplicate notification '{}'", id);
                return None;
            }
            Verdict::Burst(elapsed) => {
                log::debug!(
                    "Suppressing burst for '{}' ({} ms after previous)",
                    key,
                    elapsed
                );
                return None;
            }
        }

        self.seen.insert(
            id.clone(),
            self.config.identity_capacity,
            self.config.identity_trim_to,
        );
        self.bursts.insert(key, now);
        let retention = self.config.burst_retention_ms;
        self.bursts
            .retain(|_, accepted_at| now.saturating_sub(*accepted_at) <= retention);

        let notification = Arc::new(Notification {
            message: render_message(&event),
            id,
            received_at: now,
            event,
        });
        log::debug!("Accepted notification '{}'", notification.id);

        self.log.push_front(Arc::clone(&notification));
        self.log.truncate(self.config.log_capacity);
        self.latest = Some(Arc::clone(&notification));

        Some(notification)
    }

    fn classify(&self, id: &str, key: &str, now: u64) -> Verdict {
        if self.seen.contains(id) {
            return Verdict::Duplicate;
        }
        match self.bursts.get(key) {
            Some(&last) if now.saturating_sub(last) < self.config.burst_window_ms => {
                Verdict::Burst(now.saturating_sub(last))
            }
            _ => Verdict::Accepted,
        }
    }

    pub fn latest(&self) -> Option<Arc<Notification>> {
        self.latest.clone()
    }

    /// Snapshot of the retained log, newest first.
    pub fn all(&self) -> Vec<Arc<Notification>> {
        self.log.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Empties the retained log. Seen identities and burst entries stay.
    pub fn clear_all(&mut self) {
        self.log.clear();
    }

    /// Removes the entry at `index`; out-of-range indices are ignored.
    pub fn dismiss(&mut self, index: usize) -> Option<Arc<Notification>> {
        let removed = self.log.remove(index);
        if removed.is_none() {
            log::debug!(
                "Ignoring dismiss of index {} (log holds {})",
                index,
                self.log.len()
            );
        }
        removed
    }

    #[cfg(test)]
    fn seen_len(&self) -> usize {
        self.seen.len()
    }

    #[cfg(test)]
    fn burst_len(&self) -> usize {
        self.bursts.len()
    }
}

impl Default for DedupFilter {
    fn default() -> Self {
        Self::new()
    }
}
