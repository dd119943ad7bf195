use alloc::sync::Arc;

use crate::key::{CacheKey, CacheMap};
use crate::{QueryKey, SearchResult};

/// Expiry policy for [`ResultCache`].
///
/// Entries younger than `stale_time_ms` are fresh. Entries between `stale_time_ms` and
/// `cache_time_ms` are served but should be revalidated. Entries at or past `cache_time_ms` are
/// dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CachePolicy {
    pub stale_time_ms: u64,
    pub cache_time_ms: u64,
    /// Upper bound on stored entries; the oldest entry is evicted on insert when full.
    pub max_entries: Option<usize>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_time_ms: 30_000,
            cache_time_ms: 300_000,
            max_entries: Some(256),
        }
    }
}

/// Outcome of a cache read.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheLookup {
    /// Within `stale_time`: serve without touching the network.
    Fresh(Arc<SearchResult>),
    /// Past `stale_time` but within `cache_time`: serve now and revalidate in the background.
    ///
    /// `refresh` is `true` for the first stale read since the entry was written, so callers
    /// schedule at most one background refresh per entry.
    Stale {
        result: Arc<SearchResult>,
        refresh: bool,
    },
    Miss,
}

impl CacheLookup {
    pub fn result(&self) -> Option<&Arc<SearchResult>> {
        match self {
            Self::Fresh(r) | Self::Stale { result: r, .. } => Some(r),
            Self::Miss => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheStats {
    pub fresh_hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Clone, Debug)]
struct Entry {
    result: Arc<SearchResult>,
    stored_at_ms: u64,
    refreshing: bool,
    well_formed: bool,
}

enum Verdict {
    Fresh,
    Stale,
    Expired,
    Corrupt,
}

/// Memoizes search results keyed by normalized query parameters.
///
/// Time is supplied by the caller (`now_ms`); the cache never reads a clock and never runs a
/// background sweep. Expired entries are purged lazily on access.
#[derive(Clone, Debug)]
pub struct ResultCache<K = QueryKey> {
    policy: CachePolicy,
    entries: CacheMap<K, Entry>,
    stats: CacheStats,
}

impl<K: CacheKey> ResultCache<K> {
    pub fn new(policy: CachePolicy) -> Self {
        sdebug!(
            stale_time_ms = policy.stale_time_ms,
            cache_time_ms = policy.cache_time_ms,
            "ResultCache::new"
        );
        Self {
            policy,
            entries: CacheMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: CachePolicy) {
        self.policy = policy;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&mut self, key: &K, now_ms: u64) -> CacheLookup {
        let Some(entry) = self.entries.get(key) else {
            self.stats.misses += 1;
            return CacheLookup::Miss;
        };

        match self.verdict(entry, now_ms) {
            Verdict::Fresh => {
                self.stats.fresh_hits += 1;
                CacheLookup::Fresh(Arc::clone(&entry.result))
            }
            Verdict::Stale => {
                self.stats.stale_hits += 1;
                let Some(entry) = self.entries.get_mut(key) else {
                    return CacheLookup::Miss;
                };
                let refresh = !entry.refreshing;
                entry.refreshing = true;
                CacheLookup::Stale {
                    result: Arc::clone(&entry.result),
                    refresh,
                }
            }
            Verdict::Expired => {
                strace!(now_ms, "ResultCache: dropping expired entry");
                self.entries.remove(key);
                self.stats.misses += 1;
                CacheLookup::Miss
            }
            Verdict::Corrupt => {
                swarn!(now_ms, "ResultCache: dropping malformed entry");
                self.entries.remove(key);
                self.stats.misses += 1;
                CacheLookup::Miss
            }
        }
    }

    pub fn set(&mut self, key: K, result: impl Into<Arc<SearchResult>>, now_ms: u64) {
        if let Some(max) = self.policy.max_entries {
            if max == 0 {
                return;
            }
            if self.entries.len() >= max && !self.entries.contains_key(&key) {
                self.evict_oldest();
            }
        }
        let result = result.into();
        let well_formed = result.is_well_formed();
        if !well_formed {
            swarn!(sequence = result.sequence, "ResultCache: storing a malformed result");
        }
        self.entries.insert(
            key,
            Entry {
                result,
                stored_at_ms: now_ms,
                refreshing: false,
                well_formed,
            },
        );
    }

    /// Clears the revalidation mark so the next stale read schedules a refresh again.
    ///
    /// Call this when a background refresh fails or is discarded.
    pub fn release_refresh(&mut self, key: &K) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.refreshing = false;
        }
    }

    /// Removes every entry matching `predicate` and returns how many were removed.
    pub fn invalidate(&mut self, mut predicate: impl FnMut(&K, &SearchResult) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, e| !predicate(k, &e.result));
        let removed = before - self.entries.len();
        sdebug!(removed, "ResultCache::invalidate");
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops every entry at or past `cache_time`.
    ///
    /// Optional: reads already treat such entries as misses.
    pub fn purge_expired(&mut self, now_ms: u64) -> usize {
        let cache_time = self.policy.cache_time_ms;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now_ms.saturating_sub(e.stored_at_ms) < cache_time);
        before - self.entries.len()
    }

    fn verdict(&self, entry: &Entry, now_ms: u64) -> Verdict {
        if entry.stored_at_ms > now_ms || !entry.well_formed {
            return Verdict::Corrupt;
        }
        let age = now_ms - entry.stored_at_ms;
        if age >= self.policy.cache_time_ms {
            Verdict::Expired
        } else if age < self.policy.stale_time_ms {
            Verdict::Fresh
        } else {
            Verdict::Stale
        }
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.stored_at_ms)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }
}

impl<K: CacheKey> Default for ResultCache<K> {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}
