//! Time-windowed skip list for recently escalated conversations.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/// Conversations escalated within the last `window`, skipped while scanning.
///
/// Bounded by `capacity`; when full, the soonest-expiring entry goes first.
#[derive(Debug)]
pub struct ReopenCooldown {
    window: Duration,
    capacity: usize,
    until: HashMap<String, Instant>,
}

impl ReopenCooldown {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity,
            until: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero() && self.capacity > 0
    }

    /// Put `key` on cooldown starting at `now`.
    pub fn insert(&mut self, key: &str, now: Instant) {
        let key = normalize_key(key);
        if !self.is_enabled() || key.is_empty() {
            return;
        }
        if !self.until.contains_key(&key) && self.until.len() >= self.capacity {
            self.evict_expired(now);
            if self.until.len() >= self.capacity
                && let Some(soonest) = self
                    .until
                    .iter()
                    .min_by_key(|(_, deadline)| **deadline)
                    .map(|(k, _)| k.clone())
            {
                self.until.remove(&soonest);
            }
        }
        self.until.insert(key, now + self.window);
    }

    /// Whether `key` is still cooling down at `now`.
    pub fn contains(&self, key: &str, now: Instant) -> bool {
        self.until
            .get(&normalize_key(key))
            .is_some_and(|deadline| *deadline > now)
    }

    /// Drop every entry whose window has passed.
    pub fn evict_expired(&mut self, now: Instant) {
        self.until.retain(|_, deadline| *deadline > now);
    }

    pub fn len(&self) -> usize {
        self.until.len()
    }

    pub fn is_empty(&self) -> bool {
        self.until.is_empty()
    }
}

/// Case-folded title with runs of whitespace collapsed.
fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
