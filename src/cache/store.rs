//! Key-value store port
//!
//! `KvStore` is the minimal surface the cache facade and rate limiter need:
//! GET / SET-with-TTL / DEL / cursor-paged SCAN / atomic INCR / EXPIRE.
//! `MemoryKvStore` implements it in-process with the same cursor and TTL
//! semantics so every consumer is testable without a server.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("key-value store error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, CacheError>;

/// Capability interface over the key-value store.
///
/// Implementations must make `incr` atomic; it is the only primitive the
/// rate limiter's correctness depends on.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// SET with expiry. The value always carries a TTL; nothing in this
    /// crate stores unbounded keys.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()>;

    /// Delete the given keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> StoreResult<u64>;

    /// Increment the integer at `key`, creating it at 1.
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// Set an expiry on an existing key. Returns false if the key is absent.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool>;

    /// One page of a cursor scan. A returned cursor of 0 ends the cycle;
    /// callers loop until then (see `Cache::scan`).
    async fn scan_page(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> StoreResult<(u64, Vec<String>)>;
}

/// Match `key` against a glob `pattern` supporting `*` wildcards, which is
/// all the crate's key namespaces need.
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let mut rest = key;
    let last = parts.len() - 1;

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }

        if i == 0 {
            rest = match rest.strip_prefix(part) {
                Some(r) => r,
                None => return false,
            };
        } else if i == last {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(idx) => rest = &rest[idx + part.len()..],
                None => return false,
            }
        }
    }

    true
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if at <= Instant::now())
    }
}

/// In-process `KvStore` with real TTL expiry and paged scans.
///
/// Keys are held in a `BTreeMap` so scan pages enumerate in a stable order
/// and a full cursor cycle sees every live key exactly once.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<Mutex<BTreeMap<String, Entry>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut map = self.inner.lock().unwrap();
        match map.get(key) {
            Some(entry) if entry.expired() => {
                map.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        let mut map = self.inner.lock().unwrap();
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        let mut map = self.inner.lock().unwrap();
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = map.remove(key) {
                if !entry.expired() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut map = self.inner.lock().unwrap();

        if map.get(key).is_some_and(|e| e.expired()) {
            map.remove(key);
        }

        match map.get_mut(key) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| {
                    CacheError::Backend(format!("value at {key} is not an integer"))
                })?;
                entry.value = (current + 1).to_string();
                Ok(current + 1)
            }
            None => {
                map.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        let mut map = self.inner.lock().unwrap();
        match map.get_mut(key) {
            Some(entry) if !entry.expired() => {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_seconds));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn scan_page(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> StoreResult<(u64, Vec<String>)> {
        let map = self.inner.lock().unwrap();

        let matching: Vec<String> = map
            .iter()
            .filter(|(key, entry)| !entry.expired() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();

        let start = cursor as usize;
        if start >= matching.len() {
            return Ok((0, Vec::new()));
        }

        let end = (start + count.max(1)).min(matching.len());
        let page = matching[start..end].to_vec();
        let next = if end == matching.len() { 0 } else { end as u64 };

        Ok((next, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_match_wildcards() {
        assert!(glob_match("taskmanager:user:refresh:*", "taskmanager:user:refresh:abc"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a*c", "abc"));
        assert!(glob_match("a*c", "ac"));
        assert!(!glob_match("a*c", "ab"));
        assert!(!glob_match("a*a", "a"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
    }

    #[tokio::test]
    async fn incr_is_monotonic_and_preserves_value() {
        let store = MemoryKvStore::new();

        assert_eq!(store.incr("counter").await.unwrap(), 1);
        assert_eq!(store.incr("counter").await.unwrap(), 2);
        assert_eq!(store.incr("counter").await.unwrap(), 3);

        assert_eq!(store.get("counter").await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn expire_reports_key_presence() {
        let store = MemoryKvStore::new();

        store.set_ex("k", "v", 60).await.unwrap();
        assert!(store.expire("k", 120).await.unwrap());
        assert!(!store.expire("missing", 120).await.unwrap());
    }

    #[tokio::test]
    async fn del_counts_removed_keys() {
        let store = MemoryKvStore::new();

        store.set_ex("a", "1", 60).await.unwrap();
        store.set_ex("b", "2", 60).await.unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(store.del(&keys).await.unwrap(), 2);
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn scan_pages_cover_all_matches() {
        let store = MemoryKvStore::new();

        for i in 0..7 {
            store.set_ex(&format!("ns:{i}"), "v", 60).await.unwrap();
        }
        store.set_ex("other:0", "v", 60).await.unwrap();

        let mut cursor = 0;
        let mut seen = Vec::new();
        loop {
            let (next, page) = store.scan_page(cursor, "ns:*", 3).await.unwrap();
            seen.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        assert_eq!(seen.len(), 7);
    }
}
