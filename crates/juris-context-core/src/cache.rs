//! Bounded LRU cache of model responses.
//!
//! Keys combine the query with a short trailing window of the transcript
//! (see [`cache_key`]), so a hit means "same question in a similar dialogue
//! state". Recency is tracked by access, not insertion: `get` refreshes an
//! entry. Eviction scans for the oldest access, which is fine at the
//! capacities this cache is configured with.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};

use crate::models::Message;

pub const DEFAULT_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_KEY_WINDOW: usize = 3;

/// Derive a cache key from the query and the last `window` transcript turns.
pub fn cache_key(query: &str, transcript: &[Message], window: usize) -> String {
    let start = transcript.len().saturating_sub(window);
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    for turn in &transcript[start..] {
        hasher.update([0x1e]);
        hasher.update(turn.role.as_str().as_bytes());
        hasher.update([0x1f]);
        hasher.update(turn.content.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

struct CacheEntry {
    value: String,
    last_access: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    clock: u64,
}

impl CacheInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Thread-safe LRU response cache. One mutex covers get, set and clear.
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let now = inner.tick();
        inner.entries.get_mut(key).map(|entry| {
            entry.last_access = now;
            entry.value.clone()
        })
    }

    /// Insert or replace. Evicts the least recently accessed entry when full.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let now = inner.tick();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                value: value.into(),
                last_access: now,
            },
        );
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
