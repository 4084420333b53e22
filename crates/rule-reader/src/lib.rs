//! Rule-reading service for geogate: the backend query boundary, the
//! short-TTL rule cache fronting it, and the specificity-ranked resolver
//! that turns a rule filter into an access decision.

pub mod cache;
pub mod metrics;
pub mod reader;
pub mod store;

pub use cache::RuleCache;
pub use reader::{CachedRuleReader, RuleReader};
pub use store::{InMemoryRuleBackend, RuleBackend, RuleQuery, StoreError};

#[cfg(test)]
mod tests;
