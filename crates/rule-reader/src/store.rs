//! Rule store boundary: the backend query contract and an in-memory
//! backend for embedding and tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use geogate_rule_model::{RuleFilter, RuleRecord};

/// Failure talking to the authoritative rule store. Always fatal for the
/// current request; the engine never converts it into an implicit allow.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("rule store query failed: {0}")]
    QueryFailed(String),

    #[error("rule store unavailable: {0}")]
    Unavailable(String),
}

/// Structural query key for rule lookups. Semantically identical queries
/// compare equal regardless of call site.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleQuery {
    /// Every rule the store knows about.
    All,
    /// Rules accepted by the given filter.
    Matching(RuleFilter),
}

/// Authoritative rule source, typically backed by a relational store.
/// Results come back in the store's priority order.
#[async_trait]
pub trait RuleBackend: Send + Sync {
    async fn search(&self, query: &RuleQuery) -> Result<Vec<RuleRecord>, StoreError>;
}

/// Rule backend holding its rule set in memory.
#[derive(Default)]
pub struct InMemoryRuleBackend {
    rules: RwLock<Vec<RuleRecord>>,
}

impl InMemoryRuleBackend {
    pub fn new(rules: Vec<RuleRecord>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    pub fn insert(&self, rule: RuleRecord) {
        self.rules.write().push(rule);
    }
}

#[async_trait]
impl RuleBackend for InMemoryRuleBackend {
    async fn search(&self, query: &RuleQuery) -> Result<Vec<RuleRecord>, StoreError> {
        let rules = self.rules.read();
        Ok(match query {
            RuleQuery::All => rules.clone(),
            RuleQuery::Matching(filter) => rules
                .iter()
                .filter(|rule| rule.matches(filter))
                .cloned()
                .collect(),
        })
    }
}
