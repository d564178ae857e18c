//! Request-rate governor
//!
//! Fixed-window counters over the key-value store. Two policies:
//! a per-identity API throughput limit and a per-user task-creation quota
//! per calendar date.
//!
//! Fixed windows trade boundary bursts for O(1) memory and a single round
//! trip per check, which is the right deal for an abuse gate. Counter-store
//! outages fail open: a warning is logged and the request is admitted.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::cache::KvStore;
use crate::clock::Clock;
use crate::config::{RATE_NAMESPACE, TASK_QUOTA_WINDOW_SECONDS, TTL_BUFFER_SECONDS};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Resolve the identity a request is counted against: the authenticated
    /// user when present, otherwise the first forwarded network address
    /// normalized (IPv4-mapped-IPv6 prefix stripped), else a sentinel.
    pub fn client_identity(user_id: Option<&str>, forwarded_for: Option<&str>) -> String {
        if let Some(user_id) = user_id {
            return user_id.to_string();
        }

        forwarded_for
            .and_then(|header| header.split(',').next())
            .map(|addr| addr.trim().trim_start_matches("::ffff:").to_string())
            .filter(|addr| !addr.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Admit or reject a request under the generic API policy.
    pub async fn check_api_limit(
        &self,
        identity: &str,
        max_requests: u32,
        window_seconds: u64,
    ) -> Result<()> {
        let key = self.api_key(identity, window_seconds);
        let count = self.increment_counter(&key, window_seconds).await;

        if count > i64::from(max_requests) {
            return Err(AppError::RateLimitExceeded {
                limit: max_requests,
                count,
                key,
            });
        }

        Ok(())
    }

    /// Admit or reject one task creation against the per-date quota.
    pub async fn check_task_creation_limit(
        &self,
        user_id: &str,
        task_date: NaiveDate,
        limit: u32,
    ) -> Result<()> {
        let key = format!("{RATE_NAMESPACE}:tasks:{user_id}:{task_date}");
        let count = self.increment_counter(&key, TASK_QUOTA_WINDOW_SECONDS).await;

        if count > i64::from(limit) {
            return Err(AppError::RateLimitExceeded { limit, count, key });
        }

        Ok(())
    }

    fn api_key(&self, identity: &str, window_seconds: u64) -> String {
        let window = self.clock.now().timestamp_millis() / (window_seconds as i64 * 1000);
        format!("{RATE_NAMESPACE}:api:{identity}{window}")
    }

    /// Increment the counter at `key`, stamping the expiry only on the first
    /// increment of the window. A store error yields 0, which admits the
    /// request: the governor never turns an outage into rejected traffic.
    async fn increment_counter(&self, key: &str, ttl_seconds: u64) -> i64 {
        let count = match self.store.incr(key).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!("Rate counter unavailable, admitting request: {}", err);
                return 0;
            }
        };

        if count == 1 {
            if let Err(err) = self
                .store
                .expire(key, ttl_seconds + TTL_BUFFER_SECONDS)
                .await
            {
                tracing::warn!("Failed to set rate counter expiry for {}: {}", key, err);
            }
        }

        count
    }
}
