//! Bounded in-memory memo for geocode lookups.
//!
//! Owned by the composition root and injected into the resolver. Only
//! successful lookups are stored; failures are never memoized, so a
//! repeated query retries both providers.

use std::collections::{HashMap, VecDeque};

use crate::domain::GeocodeResult;

/// Default capacity before the oldest entry is evicted.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Insertion-ordered map with oldest-first eviction.
#[derive(Debug)]
pub struct GeocodeCache {
    entries: HashMap<String, GeocodeResult>,
    order: VecDeque<String>,
    capacity: usize,
}

impl GeocodeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<&GeocodeResult> {
        self.entries.get(key)
    }

    /// Stores `value` under `key`. Re-inserting an existing key replaces
    /// the value without changing its eviction slot.
    pub fn insert(&mut self, key: String, value: GeocodeResult) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
            while self.entries.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for GeocodeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
