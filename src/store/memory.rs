use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::Result;
use crate::store::LockStore;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// In-process store. Expiry follows the tokio clock, so paused-time tests
/// can step past a TTL with `tokio::time::advance`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining time to live of a live key. `Some(None)` means no expiry.
    pub async fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at.map(|deadline| deadline - now))
    }

    fn entry(value: &str, ttl: Option<Duration>) -> Entry {
        Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        entries.insert(key.to_string(), Self::entry(value, ttl));
        Ok(true)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), Self::entry(value, ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(e) if e.is_live(now) => Ok(Some(e.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = glob::Pattern::new(pattern)?;
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.is_live(now));
        Ok(entries
            .keys()
            .filter(|k| pattern.matches(k))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CronlockError;

    #[tokio::test]
    async fn set_if_absent_does_not_overwrite() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("k", "first", None).await.unwrap());
        assert!(!store.set_if_absent("k", "second", None).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn set_overwrites_and_clears_ttl() {
        let store = MemoryStore::new();
        store
            .set("k", "a", Some(Duration::from_secs(10)))
            .await
            .unwrap();
        store.set("k", "b", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.ttl("k").await, Some(None));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set_if_absent("k", "v", Some(Duration::from_secs(2)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.set_if_absent("k", "again", None).await.unwrap());
    }

    #[tokio::test]
    async fn list_keys_filters_by_pattern() {
        let store = MemoryStore::new();
        store.set("job-a", "1", None).await.unwrap();
        store.set("job-b", "2", None).await.unwrap();
        store.set("other", "3", None).await.unwrap();

        let mut keys = store.list_keys("job-*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["job-a".to_string(), "job-b".to_string()]);
        assert_eq!(store.list_keys("*").await.unwrap().len(), 3);
        assert_eq!(store.list_keys("job-?").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_keys_supports_character_classes() {
        let store = MemoryStore::new();
        store.set("job-a", "1", None).await.unwrap();
        store.set("job-b", "2", None).await.unwrap();
        store.set("job-c", "3", None).await.unwrap();

        let mut keys = store.list_keys("job-[ab]").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["job-a".to_string(), "job-b".to_string()]);
        assert_eq!(store.list_keys("job-[!ab]").await.unwrap(), vec!["job-c".to_string()]);
    }

    #[tokio::test]
    async fn list_keys_rejects_invalid_pattern() {
        let store = MemoryStore::new();
        store.set("job-a", "1", None).await.unwrap();

        let err = store.list_keys("job-[").await.unwrap_err();
        assert!(matches!(err, CronlockError::InvalidPattern(_)));
    }

    #[tokio::test]
    async fn missing_key_reads_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store.ttl("nope").await.is_none());
    }
}
