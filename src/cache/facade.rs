//! Typed best-effort cache facade
//!
//! Wraps a `KvStore` with JSON serialization and a swallow-and-log error
//! policy: callers always get a usable (possibly empty) result. The one
//! exception is `get_checked`, for callers that must tell a backend failure
//! apart from a genuine miss (refresh-session lookup).

use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::store::{CacheError, KvStore};
use crate::config::{SCAN_PAGE_SIZE, TASKS_NAMESPACE};

/// Cache key covering one user's task listing for one calendar date.
///
/// Every mutation path derives the dates it touched and deletes these keys.
pub fn listing_key(user_id: &str, date: NaiveDate) -> String {
    format!("{TASKS_NAMESPACE}:{user_id}:{date}")
}

#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KvStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Store `value` as JSON under `key` with the given TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!("Failed to serialize cache value for {}: {}", key, err);
                return;
            }
        };

        if let Err(err) = self.store.set_ex(key, &serialized, ttl_seconds).await {
            tracing::warn!("Cache set failed for {}: {}", key, err);
        }
    }

    /// Fetch and deserialize `key`. Backend errors and decode failures are
    /// logged and reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get_checked(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("Cache get failed for {}: {}", key, err);
                None
            }
        }
    }

    /// Like `get`, but surfaces backend errors so the caller can distinguish
    /// "store is down" from "key is absent".
    pub async fn get_checked<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self.store.get(key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(err) => {
                    tracing::warn!("Discarding undecodable cache entry {}: {}", key, err);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Delete a single key, returning the deleted count.
    pub async fn delete(&self, key: &str) -> u64 {
        let keys = [key.to_string()];
        self.delete_many(&keys).await
    }

    /// Delete many keys at once, returning the deleted count.
    pub async fn delete_many(&self, keys: &[String]) -> u64 {
        if keys.is_empty() {
            return 0;
        }

        match self.store.del(keys).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!("Cache delete failed: {}", err);
                0
            }
        }
    }

    /// Enumerate every key matching `pattern`, following the store's cursor
    /// protocol for a full cycle. Returns an empty list on backend error.
    pub async fn scan(&self, pattern: &str) -> Vec<String> {
        let mut cursor = 0;
        let mut keys = Vec::new();

        loop {
            match self.store.scan_page(cursor, pattern, SCAN_PAGE_SIZE).await {
                Ok((next, page)) => {
                    keys.extend(page);
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                Err(err) => {
                    tracing::warn!("Cache scan failed for {}: {}", pattern, err);
                    return Vec::new();
                }
            }
        }

        keys
    }
}
