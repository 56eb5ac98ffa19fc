//! Session cache — short-lived key-value storage for live quiz snapshots.
//!
//! Entries carry a TTL. Expiry is enforced lazily on read (an expired entry
//! is indistinguishable from a missing one) and eagerly by the background
//! sweeper spawned from [`spawn_sweeper`], so abandoned sessions do not pile
//! up between reads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::EngineError;

/// Expiring key-value storage. Implementations are shared across tasks, so
/// every method takes `&self`.
pub trait SessionCache: Send + Sync {
    fn cache_type(&self) -> &str;

    /// Look up a live entry. Expired entries read as absent.
    fn get(&self, key: &str) -> Result<Option<String>, EngineError>;

    /// Insert or replace an entry, restarting its TTL.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), EngineError>;

    /// Remove an entry. Returns whether a live entry was present.
    fn delete(&self, key: &str) -> Result<bool, EngineError>;

    /// Drop every expired entry, returning how many were removed.
    fn purge_expired(&self) -> Result<usize, EngineError>;
}

// ── In-memory implementation ─────────────────────────────────────────────────

struct Entry {
    value: String,
    expires_at: Instant,
}

pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, EngineError> {
        self.entries
            .lock()
            .map_err(|_| EngineError::Cache("session cache lock poisoned".into()))
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCache for MemoryCache {
    fn cache_type(&self) -> &str {
        "in-memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), EngineError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, EngineError> {
        let mut entries = self.lock()?;
        match entries.remove(key) {
            Some(entry) => Ok(entry.expires_at > Instant::now()),
            None => Ok(false),
        }
    }

    fn purge_expired(&self) -> Result<usize, EngineError> {
        let mut entries = self.lock()?;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}

// ── Background sweeper ───────────────────────────────────────────────────────

/// Spawn the periodic purge task. Runs until the token is cancelled.
pub fn spawn_sweeper(
    cache: Arc<dyn SessionCache>,
    every: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(every_secs = every.as_secs(), "session sweeper running");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("session sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match cache.purge_expired() {
                        Ok(0) => {}
                        Ok(n) => debug!(purged = n, "expired quiz sessions removed"),
                        Err(e) => warn!(error = %e, "session sweep failed"),
                    }
                }
            }
        }
    })
}
