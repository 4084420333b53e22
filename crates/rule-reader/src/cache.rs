//! Short-TTL memoization of rule-set lookups so the backing store is not
//! hit for every request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use geogate_rule_model::RuleRecord;

use crate::metrics;
use crate::store::{RuleBackend, RuleQuery, StoreError};

/// Staleness window after which an entry is refreshed.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
/// Bound on distinct query keys kept at once.
pub const DEFAULT_CAPACITY: usize = 10_000;

struct CacheEntry {
    rules: Arc<Vec<RuleRecord>>,
    /// End of the previous successful refresh.
    refreshed_at: Instant,
}

/// TTL cache fronting the rule store. Fresh entries are served through a
/// read lock; refreshes are serialized by a single mutex so concurrent
/// callers sharing a key issue one backend query between them.
pub struct RuleCache {
    backend: Arc<dyn RuleBackend>,
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<RuleQuery, CacheEntry>>,
    refresh: Mutex<()>,
}

impl RuleCache {
    pub fn new(backend: Arc<dyn RuleBackend>) -> Self {
        Self::with_ttl(backend, DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_ttl(backend: Arc<dyn RuleBackend>, ttl: Duration, capacity: usize) -> Self {
        Self {
            backend,
            ttl,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
            refresh: Mutex::new(()),
        }
    }

    /// Serve a fresh cached rule set, refreshing it from the backend when
    /// the entry is absent or older than the staleness window.
    pub async fn search(&self, query: &RuleQuery) -> Result<Arc<Vec<RuleRecord>>, StoreError> {
        if let Some(rules) = self.fresh(query) {
            metrics::CACHE_HITS.inc();
            return Ok(rules);
        }

        let _refresh = self.refresh.lock().await;
        // A waiter queued behind another refresh of the same key finds the
        // entry fresh now and skips its own backend query.
        if let Some(rules) = self.fresh(query) {
            metrics::CACHE_HITS.inc();
            return Ok(rules);
        }

        metrics::CACHE_REFRESHES.inc();
        debug!(?query, "refreshing rule cache entry");
        let rules = Arc::new(self.backend.search(query).await?);

        let mut entries = self.entries.write();
        entries.insert(
            query.clone(),
            CacheEntry {
                rules: Arc::clone(&rules),
                refreshed_at: Instant::now(),
            },
        );
        while entries.len() > self.capacity {
            let stalest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.refreshed_at)
                .map(|(key, _)| key.clone());
            match stalest {
                Some(key) => {
                    entries.remove(&key);
                    warn!(evicted = ?key, "rule cache over capacity, dropping least recently refreshed entry");
                }
                None => break,
            }
        }

        Ok(rules)
    }

    /// Every rule known to the store, through the same staleness window.
    pub async fn find_all(&self) -> Result<Arc<Vec<RuleRecord>>, StoreError> {
        self.search(&RuleQuery::All).await
    }

    fn fresh(&self, query: &RuleQuery) -> Option<Arc<Vec<RuleRecord>>> {
        let entries = self.entries.read();
        entries
            .get(query)
            .filter(|entry| entry.refreshed_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.rules))
    }
}
