// src/store.rs
//! Key-value store used as the session registry and the rate-limit counter.
//!
//! Two backends: Redis for deployments, and a moka cache with per-entry TTL for
//! single-process development and tests.
use crate::error::{AppError, Result};
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::Op;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::{Duration, Instant};

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Increments an integer counter, creating it at 1 without expiry when absent.
    /// An existing expiry is preserved.
    async fn increment(&self, key: &str) -> Result<i64>;
    /// Sets the expiry of an existing key. Missing keys are left alone.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
    /// Like `expire`, but only when the key currently has no expiry.
    async fn expire_if_persistent(&self, key: &str, ttl: Duration) -> Result<()>;
}

// Redis rejects zero-second expiries.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis");
        Ok(Self { conn, timeout })
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => {
                tracing::error!("Redis {} timed out after {:?}", op, self.timeout);
                Err(AppError::Store(format!("{} timed out", op)))
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded("SET", async move {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs(ttl))
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded("GET", async move {
            redis::cmd("GET")
                .arg(key)
                .query_async::<_, Option<String>>(&mut conn)
                .await
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded("DEL", async move {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        self.bounded("INCR", async move {
            redis::cmd("INCR")
                .arg(key)
                .query_async::<_, i64>(&mut conn)
                .await
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded("EXPIRE", async move {
            redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl_secs(ttl))
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn expire_if_persistent(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded("EXPIRE NX", async move {
            redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl_secs(ttl))
                .arg("NX")
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }
}

#[derive(Clone, Copy, Debug)]
enum Ttl {
    /// Keep whatever expiry the entry already had.
    Keep,
    For(Duration),
    Persist,
}

#[derive(Clone, Debug)]
struct Slot {
    value: String,
    ttl: Ttl,
    /// Whether the entry carries an expiry at all.
    expiring: bool,
}

struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        slot: &Slot,
        _created_at: Instant,
    ) -> Option<Duration> {
        match slot.ttl {
            Ttl::For(ttl) => Some(ttl),
            Ttl::Keep | Ttl::Persist => None,
        }
    }

    fn expire_after_update(
        &self,
        _key: &String,
        slot: &Slot,
        _updated_at: Instant,
        duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        match slot.ttl {
            Ttl::For(ttl) => Some(ttl),
            Ttl::Keep => duration_until_expiry,
            Ttl::Persist => None,
        }
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    cache: Cache<String, Slot>,
}

impl MemoryStore {
    /// Unbounded, so every write stays readable until its own TTL lapses.
    pub fn new() -> Self {
        let cache = Cache::builder().expire_after(SlotExpiry).build();
        Self { cache }
    }

    async fn reexpire(&self, key: &str, ttl: Duration, only_persistent: bool) {
        self.cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing.map(|e| e.into_value()) {
                    Some(slot) if !(only_persistent && slot.expiring) => Op::Put(Slot {
                        ttl: Ttl::For(ttl),
                        expiring: true,
                        ..slot
                    }),
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let slot = Slot {
            value: value.to_string(),
            ttl: Ttl::For(ttl),
            expiring: true,
        };
        self.cache.insert(key.to_string(), slot).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.get(key).await.map(|slot| slot.value))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let entry = self
            .cache
            .entry(key.to_string())
            .and_upsert_with(|existing| {
                let next = match existing.map(|e| e.into_value()) {
                    Some(slot) => match slot.value.parse::<i64>() {
                        Ok(n) => Slot {
                            value: (n + 1).to_string(),
                            ttl: Ttl::Keep,
                            ..slot
                        },
                        // left untouched; reported below
                        Err(_) => Slot {
                            ttl: Ttl::Keep,
                            ..slot
                        },
                    },
                    None => Slot {
                        value: "1".to_string(),
                        ttl: Ttl::Persist,
                        expiring: false,
                    },
                };
                std::future::ready(next)
            })
            .await;
        entry
            .into_value()
            .value
            .parse::<i64>()
            .map_err(|_| AppError::Store(format!("value at {} is not an integer", key)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.reexpire(key, ttl, false).await;
        Ok(())
    }

    async fn expire_if_persistent(&self, key: &str, ttl: Duration) -> Result<()> {
        self.reexpire(key, ttl, true).await;
        Ok(())
    }
}
