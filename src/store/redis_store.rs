use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncConnectionConfig, Client};

use crate::config::StoreConfig;
use crate::error::{CronlockError, Result};
use crate::store::LockStore;

const SCAN_BATCH: usize = 100;

/// Redis-backed store over a single multiplexed connection. Clones share the
/// connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect and verify with `PING`, retrying per `config`.
    ///
    /// Fails with [`CronlockError::StoreUnavailable`] once every attempt has
    /// failed; callers must not run the job in that case.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let attempts = config.retry_attempts.max(1);
        let mut reason = String::new();

        for attempt in 1..=attempts {
            match Self::try_connect(config).await {
                Ok(store) => {
                    tracing::debug!(url = %config.url(), attempt, "Connected to Redis");
                    return Ok(store);
                }
                Err(e) => {
                    tracing::debug!(url = %config.url(), attempt, attempts, error = %e, "Redis connection failed");
                    reason = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(config.retry_delay).await;
                    }
                }
            }
        }

        Err(CronlockError::StoreUnavailable { attempts, reason })
    }

    async fn try_connect(config: &StoreConfig) -> Result<Self> {
        let client = Client::open(config.url())?;
        let conn_config = AsyncConnectionConfig::new()
            .set_connection_timeout(config.connect_timeout)
            .set_response_timeout(config.response_timeout);
        let mut conn = client
            .get_multiplexed_async_connection_with_config(&conn_config)
            .await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(CronlockError::StoreUnavailable {
                attempts: 1,
                reason: format!("unexpected PING reply: {}", pong),
            });
        }

        Ok(Self { conn })
    }
}

/// Redis rejects `EX 0`, so sub-second TTLs round up to one second.
fn expiry_secs(ttl: Option<Duration>) -> Option<u64> {
    ttl.map(|ttl| ttl.as_secs().max(1))
}

#[async_trait]
impl LockStore for RedisStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(secs) = expiry_secs(ttl) {
            cmd.arg("EX").arg(secs);
        }
        // nil reply means the key already existed
        let reply: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(reply.is_some())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(secs) = expiry_secs(ttl) {
            cmd.arg("EX").arg(secs);
        }
        let _: String = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
        // Same pattern rules as MemoryStore.
        glob::Pattern::new(pattern)?;
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may repeat keys across batches
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
