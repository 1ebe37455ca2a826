//! Short-TTL caching for expensive component-source calls.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use attrwatch_types::AttrValue;
use parking_lot::Mutex;

use crate::error::SourceError;
use crate::source::{AttributeInfo, ComponentHandle, ComponentName, ComponentSource};

/// A map whose entries expire after a fixed TTL.
///
/// Staleness is a plain expiry comparison under one lock. The value
/// producer runs outside the lock, so concurrent callers may race to
/// repopulate the same entry; last write wins, which is acceptable for
/// idempotent lookups.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A still-fresh value, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((stored, value)) if stored.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries
            .lock()
            .insert(key, (Instant::now(), value));
    }

    /// Fresh value, or the producer's result cached on success.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        produce: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = produce()?;
        self.insert(key, value.clone());
        Ok(value)
    }
}

/// Wraps a component source with a short-TTL cache over discovery, so
/// several lifecycles refreshing against the same pattern within one TTL
/// window share a single expensive lookup.
pub struct CachedSource {
    inner: Arc<dyn ComponentSource>,
    discoveries: TtlCache<String, Vec<ComponentHandle>>,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn ComponentSource>, ttl: Duration) -> Self {
        Self {
            inner,
            discoveries: TtlCache::new(ttl),
        }
    }
}

impl ComponentSource for CachedSource {
    fn find_components(
        &self,
        pattern: &ComponentName,
    ) -> Result<Vec<ComponentHandle>, SourceError> {
        self.discoveries
            .get_or_try_insert_with(pattern.canonical(), || {
                self.inner.find_components(pattern)
            })
    }

    fn introspect(&self, handle: &ComponentHandle) -> Result<Vec<AttributeInfo>, SourceError> {
        self.inner.introspect(handle)
    }

    fn get_attribute(
        &self,
        handle: &ComponentHandle,
        name: &str,
    ) -> Result<AttrValue, SourceError> {
        self.inner.get_attribute(handle, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_support::{pool, register_pool, CountingSource};
    use std::sync::atomic::Ordering;
    use std::thread;

    #[test]
    fn fresh_entries_are_served_from_the_cache() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("key", 7);
        assert_eq!(cache.get(&"key"), Some(7));
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.insert("key", 7);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"key"), None);
    }

    #[test]
    fn producer_runs_once_within_the_ttl() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60));
        let mut calls = 0;
        for _ in 0..3 {
            let value: Result<i32, ()> = cache.get_or_try_insert_with("key", || {
                calls += 1;
                Ok(42)
            });
            assert_eq!(value, Ok(42));
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn producer_failure_is_not_cached() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60));
        let failed: Result<i32, &str> = cache.get_or_try_insert_with("key", || Err("down"));
        assert_eq!(failed, Err("down"));

        let value: Result<i32, &str> = cache.get_or_try_insert_with("key", || Ok(1));
        assert_eq!(value, Ok(1));
    }

    #[test]
    fn cached_source_coalesces_discovery() {
        let counting = Arc::new(CountingSource::default());
        register_pool(&counting.inner, "main");
        let cached = CachedSource::new(counting.clone(), Duration::from_secs(60));

        let pattern = ComponentName::new("app.pools")
            .with_property("type", "ConnectionPool")
            .with_property("name", "*");
        for _ in 0..5 {
            assert_eq!(cached.find_components(&pattern).unwrap().len(), 1);
        }
        assert_eq!(counting.finds.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cached_source_expires_and_requeries() {
        let counting = Arc::new(CountingSource::default());
        register_pool(&counting.inner, "main");
        let cached = CachedSource::new(counting.clone(), Duration::from_millis(10));

        let pattern = ComponentName::new("app.pools").with_property("type", "ConnectionPool");
        cached.find_components(&pattern).unwrap();
        thread::sleep(Duration::from_millis(20));
        cached.find_components(&pattern).unwrap();
        assert_eq!(counting.finds.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn attribute_reads_pass_through() {
        let counting = Arc::new(CountingSource::default());
        register_pool(&counting.inner, "main");
        let cached = CachedSource::new(counting, Duration::from_secs(60));

        let handle = ComponentHandle::new(pool("main"));
        assert!(cached.get_attribute(&handle, "WaitCount").is_ok());
        assert!(cached.introspect(&handle).is_ok());
    }
}
