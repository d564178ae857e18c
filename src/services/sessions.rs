//! Refresh-session store
//!
//! Refresh tokens live in the key-value store, one entry per token mapping
//! to its owner, expiring after seven days. Bulk revocation is the one
//! operation that needs full keyspace enumeration, hence `Cache::scan`.

use crate::cache::Cache;
use crate::config::{REFRESH_NAMESPACE, REFRESH_TTL_SECONDS};
use crate::error::Result;

fn token_key(token: &str) -> String {
    format!("{REFRESH_NAMESPACE}:{token}")
}

#[derive(Clone)]
pub struct RefreshSessions {
    cache: Cache,
}

impl RefreshSessions {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Record `token` as a live session for `user_id`.
    pub async fn store(&self, user_id: &str, token: &str) {
        self.cache
            .set(&token_key(token), &user_id, REFRESH_TTL_SECONDS)
            .await;
    }

    /// Resolve a token to its owner.
    ///
    /// A backend failure is surfaced rather than reported as a miss: treating
    /// an outage as "token unknown" would log users out spuriously.
    pub async fn lookup(&self, token: &str) -> Result<Option<String>> {
        let user_id: Option<String> = self.cache.get_checked(&token_key(token)).await?;

        Ok(user_id)
    }

    /// Drop a single session.
    pub async fn revoke(&self, token: &str) {
        self.cache.delete(&token_key(token)).await;
    }

    /// Drop every session owned by `user_id`. Enumerates the namespace and
    /// filters by stored owner; returns how many sessions were revoked.
    pub async fn revoke_all_for_user(&self, user_id: &str) -> u64 {
        let keys = self.cache.scan(&format!("{REFRESH_NAMESPACE}:*")).await;

        let mut owned = Vec::new();
        for key in keys {
            if self.cache.get::<String>(&key).await.as_deref() == Some(user_id) {
                owned.push(key);
            }
        }

        if owned.is_empty() {
            return 0;
        }

        let revoked = self.cache.delete_many(&owned).await;
        tracing::info!("Revoked {} refresh session(s) for {}", revoked, user_id);
        revoked
    }
}
