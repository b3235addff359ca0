// src/rate_limit.rs
use crate::error::Result;
use crate::store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Fixed-window request counter per identity.
///
/// The first hit in a window starts the window's expiry; the counter then only grows
/// until the key lapses. Bursts straddling a window boundary can therefore see up to
/// twice `max_requests` within one window length.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn user_identity(user_id: Uuid) -> String {
        format!("user:{}", user_id)
    }

    /// Store failures are returned to the caller; they never count as an allow.
    pub async fn allow(&self, identity: &str, max_requests: i64, window: Duration) -> Result<bool> {
        let key = format!("rate_limit:{}", identity);
        let count = self.store.increment(&key).await?;
        if count == 1 {
            self.store.expire(&key, window).await?;
        }
        if count > max_requests {
            // restores a window whose first EXPIRE was lost
            self.store.expire_if_persistent(&key, window).await?;
            tracing::warn!("Rate limit exceeded for {} ({} > {})", identity, count, max_requests);
            return Ok(false);
        }
        Ok(true)
    }
}
