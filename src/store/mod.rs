//! Key-value backends for job records.
//!
//! Every operation is a single atomic command against one key, so the
//! controller needs no transactions. [`LockStore::set_if_absent`] is the only
//! synchronization primitive between concurrent invocations.
//!
//! - [`RedisStore`]: production backend
//! - [`MemoryStore`]: in-process backend with the same TTL semantics

pub mod memory;
pub mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// Backend contract for job records. A `ttl` of `None` means the key never
/// expires; writing with `None` also clears any earlier expiry.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Write `value` only if `key` is absent. Returns `false`, without
    /// touching the existing value, when the key is already present.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool>;

    /// Unconditional write.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Keys matching a glob `pattern`: `*`, `?` and `[...]` classes.
    /// An invalid pattern is [`crate::CronlockError::InvalidPattern`].
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>>;
}
