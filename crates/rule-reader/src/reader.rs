//! Specificity-ranked rule resolution on top of the cache.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use geogate_rule_model::{best_match, AccessInfo, RuleFilter, RuleRecord};

use crate::cache::RuleCache;
use crate::store::{RuleQuery, StoreError};

/// Rule-reading service: authoritative, single-best-match lookup.
#[async_trait]
pub trait RuleReader: Send + Sync {
    /// Resolve the best-matching rule for `filter`, if any.
    async fn access_info(&self, filter: &RuleFilter) -> Result<Option<AccessInfo>, StoreError>;

    /// Every rule known to the store, for administrative use.
    async fn list_all(&self) -> Result<Arc<Vec<RuleRecord>>, StoreError>;
}

/// Reader serving lookups through the TTL rule cache.
pub struct CachedRuleReader {
    cache: RuleCache,
}

impl CachedRuleReader {
    pub fn new(cache: RuleCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl RuleReader for CachedRuleReader {
    async fn access_info(&self, filter: &RuleFilter) -> Result<Option<AccessInfo>, StoreError> {
        let candidates = self.cache.search(&RuleQuery::Matching(filter.clone())).await?;
        let best = best_match(&candidates, filter);
        debug!(
            candidates = candidates.len(),
            matched = best.map(|rule| rule.id),
            "resolved rule filter"
        );
        Ok(best.map(RuleRecord::access_info))
    }

    async fn list_all(&self) -> Result<Arc<Vec<RuleRecord>>, StoreError> {
        self.cache.find_all().await
    }
}
