//! In-memory memo table keyed by [`CacheKey`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::hash::CacheKey;

pub const DEFAULT_MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Keys embed chain revisions, so stale entries are never hit again; they
/// are dropped wholesale once the table reaches its limit.
#[derive(Debug, Clone)]
pub struct Memo<V> {
    entries: HashMap<CacheKey, V>,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl<V> Default for Memo<V> {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_ENTRIES)
    }
}

impl<V> Memo<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached value for `key`, computing and storing it on a miss. A failed
    /// computation stores nothing.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            tracing::debug!(entries = self.entries.len(), "cache full, dropping entries");
            self.entries.clear();
        }

        match self.entries.entry(key) {
            Entry::Occupied(slot) => {
                self.hits += 1;
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => {
                let value = compute()?;
                self.misses += 1;
                tracing::debug!(key = %slot.key(), "cache miss");
                Ok(slot.insert(value))
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}
