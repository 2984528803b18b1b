//! Bounded, optionally expiring cache used to memoize path matches.
//!
//! The policy comes from a spec string in the style of
//! `maximumSize=10000,expireAfterWrite=10m`. Expired entries are dropped lazily when
//! they are read.

use crate::metrics::MetricsSource;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheSpecError {
    #[error("Malformed cache spec entry '{0}', expected 'key=value'")]
    Malformed(String),

    #[error("Unknown cache spec key '{0}'. Valid keys are: maximumSize, expireAfterWrite, expireAfterAccess")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for cache spec key '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Parsed cache policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSpec {
    /// Maximum number of entries; `None` means unbounded.
    pub maximum_size: Option<NonZeroUsize>,
    pub expire_after_write: Option<Duration>,
    pub expire_after_access: Option<Duration>,
}

impl FromStr for CacheSpec {
    type Err = CacheSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spec = CacheSpec::default();

        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| CacheSpecError::Malformed(part.to_string()))?;

            let invalid = || CacheSpecError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            };

            match key {
                "maximumSize" => {
                    let size: usize = value.parse().map_err(|_| invalid())?;
                    spec.maximum_size = Some(NonZeroUsize::new(size).ok_or_else(invalid)?);
                }
                "expireAfterWrite" => {
                    spec.expire_after_write = Some(parse_duration(value).ok_or_else(invalid)?);
                }
                "expireAfterAccess" => {
                    spec.expire_after_access = Some(parse_duration(value).ok_or_else(invalid)?);
                }
                _ => return Err(CacheSpecError::UnknownKey(key.to_string())),
            }
        }

        Ok(spec)
    }
}

impl fmt::Display for CacheSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(size) = self.maximum_size {
            parts.push(format!("maximumSize={size}"));
        }
        if let Some(ttl) = self.expire_after_write {
            parts.push(format!("expireAfterWrite={}ms", ttl.as_millis()));
        }
        if let Some(ttl) = self.expire_after_access {
            parts.push(format!("expireAfterAccess={}ms", ttl.as_millis()));
        }
        f.write_str(&parts.join(","))
    }
}

/// `<n>` followed by `ms`, `s`, `m`, `h` or `d`; a bare number is seconds.
fn parse_duration(value: &str) -> Option<Duration> {
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        "ms" => Duration::from_millis(amount),
        "" | "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.checked_mul(60)?),
        "h" => Duration::from_secs(amount.checked_mul(60 * 60)?),
        "d" => Duration::from_secs(amount.checked_mul(24 * 60 * 60)?),
        _ => return None,
    };
    Some(duration)
}

/// Point-in-time counters of a [`MatchCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: u64,
}

struct Entry<V> {
    value: V,
    written: Instant,
    accessed: Instant,
}

/// Thread-safe LRU cache with optional write/access expiry.
///
/// `get` and `put` each take the lock briefly; callers that compute a value between
/// the two may race and store the same key twice, the last write wins.
pub struct MatchCache<K: Hash + Eq, V: Clone> {
    spec: CacheSpec,
    entries: Mutex<LruCache<K, Entry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> MatchCache<K, V> {
    pub fn new(spec: CacheSpec) -> Self {
        let entries = match spec.maximum_size {
            Some(size) => LruCache::new(size),
            None => LruCache::unbounded(),
        };

        Self {
            spec,
            entries: Mutex::new(entries),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn spec(&self) -> &CacheSpec {
        &self.spec
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = match entries.get_mut(key) {
            Some(entry) if !self.is_expired(entry, now) => {
                entry.accessed = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn put(&self, key: K, value: V) {
        let now = Instant::now();
        let entry = Entry {
            value,
            written: now,
            accessed: now,
        };

        let mut entries = self.entries.lock();
        let replaced = entries.contains(&key);
        if entries.push(key, entry).is_some() && !replaced {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len() as u64,
        }
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        let written_out = self
            .spec
            .expire_after_write
            .is_some_and(|ttl| now.duration_since(entry.written) >= ttl);
        let idle_out = self
            .spec
            .expire_after_access
            .is_some_and(|ttl| now.duration_since(entry.accessed) >= ttl);
        written_out || idle_out
    }
}

/// Publishes the counters of a cache under a fixed name prefix.
pub struct CacheMetricsSource<K: Hash + Eq, V: Clone> {
    prefix: String,
    cache: Arc<MatchCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> CacheMetricsSource<K, V> {
    pub fn new(prefix: impl Into<String>, cache: Arc<MatchCache<K, V>>) -> Self {
        Self {
            prefix: prefix.into(),
            cache,
        }
    }
}

impl<K, V> MetricsSource for CacheMetricsSource<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn apply(&self, out: &mut BTreeMap<String, u64>) {
        let stats = self.cache.stats();
        out.insert(format!("{}hits", self.prefix), stats.hits);
        out.insert(format!("{}misses", self.prefix), stats.misses);
        out.insert(format!("{}evictions", self.prefix), stats.evictions);
        out.insert(format!("{}size", self.prefix), stats.size);
    }
}
