//! Optional memoization of analysis results.
//!
//! Values are stored as `serde_json::Value` under a stable digest of the
//! analysis kind and class name. Disabling the cache ([`NoCache`]) must only
//! change speed, never results.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hex SHA-256 of `"{kind}:{class}"`
    pub fn new(kind: &str, class: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b":");
        hasher.update(class.as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub trait AnalysisCache {
    fn get(&self, key: &CacheKey) -> Option<Value>;
    fn put(&self, key: CacheKey, value: Value);
    fn clear(&self);
}

/// Per-worker in-memory cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<CacheKey, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl AnalysisCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.entries.borrow_mut().insert(key, value);
    }

    fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl AnalysisCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Option<Value> {
        None
    }

    fn put(&self, _key: CacheKey, _value: Value) {}

    fn clear(&self) {}
}

/// Return the cached value for `(kind, class)` or compute and store it.
///
/// An entry that no longer deserializes into `T` is recomputed.
pub fn cached<T, F>(cache: &dyn AnalysisCache, kind: &str, class: &str, compute: F) -> T
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> T,
{
    let key = CacheKey::new(kind, class);
    if let Some(value) = cache.get(&key) {
        match serde_json::from_value(value) {
            Ok(result) => {
                debug!("Cache hit for {} {}", kind, class);
                return result;
            }
            Err(e) => debug!("Discarding stale cache entry for {} {}: {}", kind, class, e),
        }
    }
    let result = compute();
    if let Ok(value) = serde_json::to_value(&result) {
        cache.put(key, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_cache_key_is_stable_digest() {
        let key = CacheKey::new("resource", "App\\Http\\Resources\\UserResource");
        assert_eq!(key.as_str().len(), 64);
        assert_eq!(key, CacheKey::new("resource", "App\\Http\\Resources\\UserResource"));
        assert_ne!(key, CacheKey::new("fractal", "App\\Http\\Resources\\UserResource"));
    }

    #[test]
    fn test_cached_computes_once() {
        let cache = MemoryCache::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            vec!["a".to_string()]
        };
        let first: Vec<String> = cached(&cache, "k", "C", compute);
        let second: Vec<String> = cached(&cache, "k", "C", || {
            calls.set(calls.get() + 1);
            vec![]
        });
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_no_cache_always_computes() {
        let calls = Cell::new(0);
        for _ in 0..2 {
            let _: u32 = cached(&NoCache, "k", "C", || {
                calls.set(calls.get() + 1);
                7
            });
        }
        assert_eq!(calls.get(), 2);
    }
}
