//! Short-lived response cache for the history provider.
//!
//! The cache is an ordinary value owned by whoever builds the adapter stack;
//! there is no process-wide instance.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::error::SppcastError;
use crate::domain::observation::Observation;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded map whose entries expire `ttl` after insertion.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let found = entries
            .get(key)
            .map(|e| (e.inserted_at.elapsed() < self.ttl, e.value.clone()));
        match found {
            Some((true, value)) => Some(value),
            Some((false, _)) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Caches successful [`PricePort::fetch_day`] results per point and day.
pub struct CachedPricePort<P> {
    inner: P,
    cache: TtlCache<(String, NaiveDate), Vec<Observation>>,
}

impl<P: PricePort> CachedPricePort<P> {
    pub fn new(inner: P, ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl, max_entries),
        }
    }

    pub fn from_config(inner: P, config: &dyn ConfigPort) -> Self {
        let ttl = config.get_int("cache", "ttl_secs", 300).max(0) as u64;
        let max_entries = config.get_int("cache", "max_entries", 256).max(1) as usize;
        Self::new(inner, Duration::from_secs(ttl), max_entries)
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

impl<P: PricePort> PricePort for CachedPricePort<P> {
    fn fetch_day(&self, point: &str, day: NaiveDate) -> Result<Vec<Observation>, SppcastError> {
        let key = (point.to_string(), day);
        if let Some(hit) = self.cache.get(&key) {
            debug!(point, day = %day, "history cache hit");
            return Ok(hit);
        }
        let fetched = self.inner.fetch_day(point, day)?;
        self.cache.insert(key, fetched.clone());
        Ok(fetched)
    }
}
