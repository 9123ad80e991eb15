//! Search result cache
//!
//! Responses are memoized under a key derived from the normalized request, so
//! requests that differ only in parameter order, query whitespace or duplicated
//! filter values share an entry. Entries expire after a TTL. Bumping the
//! version makes every earlier key unreachable at once.

use crate::config::CacheConfig;
use dataspace_search_dsl::SearchRequest;
use lru::LruCache;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

pub struct ResponseCache<V> {
    enabled: bool,
    ttl: Duration,
    prefix: String,
    version: AtomicU64,
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            enabled: config.enabled,
            ttl: Duration::from_secs(config.effective_ttl_seconds()),
            prefix: config.key_prefix.clone(),
            version: AtomicU64::new(1),
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// `{prefix}:{entity}:v{version}:{digest}`
    pub fn key(&self, entity: &str, request: &SearchRequest) -> String {
        format!(
            "{}:{}:v{}:{}",
            self.prefix,
            entity,
            self.version(),
            request_digest(request)
        )
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if !self.enabled {
            return None;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                tracing::debug!(key, "Search cache hit");
                record("hit");
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
            record("expired");
        }
        tracing::debug!(key, "Search cache miss");
        record("miss");
        None
    }

    pub fn insert(&self, key: String, value: V) {
        if !self.enabled || self.ttl.is_zero() {
            return;
        }
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, entry);
        record("store");
    }

    /// Make every existing key miss; returns the new version.
    pub fn invalidate_all(&self) -> u64 {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        record("invalidate");
        tracing::info!(version, "Search cache invalidated");
        version
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn record(event: &str) {
    crate::metrics::SEARCH_CACHE_EVENTS_TOTAL
        .with_label_values(&[event])
        .inc();
}

/// SHA-256 over the normalized request.
///
/// `SearchRequest` is normalized at parse time and the index request is built
/// from it alone, so equal digests always mean identical index requests.
pub fn request_digest(request: &SearchRequest) -> String {
    let canonical = json!({
        "query": request.query,
        "page": request.page,
        "size": request.size,
        "sort": request.sort,
        "order": request.order.as_str(),
        "filters": request.filters,
        "types": request.types,
    });

    hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataspace_search_dsl::PageLimits;

    fn request(pairs: &[(&str, &str)]) -> SearchRequest {
        let items: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SearchRequest::from_items(&items, PageLimits::default()).unwrap()
    }

    #[test]
    fn equivalent_requests_share_a_digest() {
        let a = request(&[("query", "Rain  Fall"), ("tags", "b,a"), ("sectors", "x")]);
        let b = request(&[("sectors", "x"), ("tags", "a"), ("tags", "b,a"), ("query", " Rain Fall ")]);
        assert_eq!(request_digest(&a), request_digest(&b));

        let c = request(&[("query", "Rain Fall"), ("tags", "a")]);
        assert_ne!(request_digest(&a), request_digest(&c));

        let paged = request(&[("query", "Rain Fall"), ("tags", "a,b"), ("sectors", "x"), ("page", "2")]);
        assert_ne!(request_digest(&a), request_digest(&paged));
    }

    #[test]
    fn query_case_changes_the_digest() {
        let upper = request(&[("query", "GDP")]);
        let lower = request(&[("query", "gdp")]);
        assert_ne!(request_digest(&upper), request_digest(&lower));
    }

    #[test]
    fn entries_round_trip_and_invalidate_by_version() {
        let cache: ResponseCache<String> = ResponseCache::new(&CacheConfig::default());
        let req = request(&[("query", "water")]);
        let key = cache.key("dataset", &req);
        assert!(key.starts_with("dataex:dataset:v1:"));

        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), "cached".to_string());
        assert_eq!(cache.get(&key).as_deref(), Some("cached"));

        assert_eq!(cache.invalidate_all(), 2);
        assert!(cache.is_empty());
        let new_key = cache.key("dataset", &req);
        assert_ne!(key, new_key);
        assert!(new_key.starts_with("dataex:dataset:v2:"));
    }

    #[test]
    fn disabled_cache_never_stores() {
        let cache: ResponseCache<u32> = ResponseCache::new(&CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        cache.insert("k".to_string(), 1);
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache: ResponseCache<u32> = ResponseCache::new(&CacheConfig::default());
        cache.entries.lock().unwrap().put(
            "k".to_string(),
            CacheEntry {
                value: 1,
                expires_at: Instant::now() - Duration::from_secs(1),
            },
        );
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_bounds_entries() {
        let cache: ResponseCache<u32> = ResponseCache::new(&CacheConfig {
            capacity: 2,
            ..CacheConfig::default()
        });
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        cache.insert("c".to_string(), 3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
    }
}
