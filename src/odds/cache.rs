//! TTL cache of odds snapshots keyed by sport
//!
//! Readers clone an `Arc` snapshot under a short read lock. Refreshes of one
//! key are serialized by a per-key async mutex so a burst of requests causes a
//! single upstream fetch. Expired snapshots are replaced whole, never patched.

use crate::error::Result;
use crate::types::GameRecord;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    fetched_at: Instant,
    games: Arc<Vec<GameRecord>>,
}

pub struct OddsCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    refresh_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl OddsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh snapshot for `key`, if any
    pub fn get(&self, key: &str) -> Option<Arc<Vec<GameRecord>>> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.games.clone())
    }

    pub fn insert(&self, key: &str, games: Vec<GameRecord>) -> Arc<Vec<GameRecord>> {
        let games = Arc::new(games);
        self.entries.write().insert(
            key.to_string(),
            CacheEntry {
                fetched_at: Instant::now(),
                games: games.clone(),
            },
        );
        games
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Return the fresh snapshot or run `fetch` once and store its result.
    /// Fetch errors are returned and not cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Arc<Vec<GameRecord>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<GameRecord>>>,
    {
        if let Some(games) = self.get(key) {
            return Ok(games);
        }

        let lock = self
            .refresh_locks
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have refreshed while we waited
        if let Some(games) = self.get(key) {
            return Ok(games);
        }

        let games = fetch().await?;
        tracing::debug!("Cached {} games for {}", games.len(), key);
        Ok(self.insert(key, games))
    }
}
