//! In-memory session store keyed by random uuids.
//!
//! Sessions expire after `ttl` without access, and the least recently used
//! session is evicted once `capacity` is reached. Values are immutable and
//! shared as `Arc<T>`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

struct Entry<T> {
    value: Arc<T>,
    last_access: Instant,
}

pub struct SessionStore<T> {
    entries: RwLock<HashMap<Uuid, Entry<T>>>,
    ttl: Duration,
    capacity: usize,
}

impl<T> SessionStore<T> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub async fn insert(&self, value: T) -> (Uuid, Arc<T>) {
        let id = Uuid::new_v4();
        let value = Arc::new(value);
        let now = Instant::now();

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| now.duration_since(entry.last_access) < self.ttl);
        while entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    debug!("Session store full; evicting {oldest}");
                    entries.remove(&oldest);
                }
                None => break,
            }
        }
        entries.insert(
            id,
            Entry {
                value: value.clone(),
                last_access: now,
            },
        );
        (id, value)
    }

    /// Live session for `id`, refreshing its idle timer.
    pub async fn get(&self, id: &Uuid) -> Option<Arc<T>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let expired = match entries.get_mut(id) {
            Some(entry) if now.duration_since(entry.last_access) < self.ttl => {
                entry.last_access = now;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(id);
        }
        None
    }

    /// Drops expired sessions and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_access) < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_insert_then_get() {
        let store = SessionStore::new(Duration::from_secs(60), 4);
        let (id, _) = store.insert("screening").await;
        assert_eq!(store.get(&id).await.as_deref(), Some(&"screening"));
        assert!(store.get(&Uuid::new_v4()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_secs(60), 4);
        let (id, _) = store.insert(1u32).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.get(&id).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_refreshes_ttl() {
        let store = SessionStore::new(Duration::from_secs(60), 4);
        let (id, _) = store.insert(1u32).await;
        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(store.get(&id).await.is_some());
        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(store.get(&id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_least_recently_used() {
        let store = SessionStore::new(Duration::from_secs(600), 2);
        let (first, _) = store.insert(1u32).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        let (second, _) = store.insert(2u32).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        store.get(&first).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        let (third, _) = store.insert(3u32).await;

        assert_eq!(store.len().await, 2);
        assert!(store.get(&second).await.is_none());
        assert!(store.get(&first).await.is_some());
        assert!(store.get(&third).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_counts_removed() {
        let store = SessionStore::new(Duration::from_secs(10), 8);
        store.insert(1u32).await;
        store.insert(2u32).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        store.insert(3u32).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.purge_expired().await, 2);
        assert_eq!(store.len().await, 1);
    }
}
