//! Cache counters exported through a shared prometheus registry.

use once_cell::sync::Lazy;
use prometheus::{IntCounter, Registry};

pub static CACHE_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "geogate_rule_cache_hits_total",
        "Rule cache lookups served without a backend query",
    )
    .expect("valid metric definition")
});

pub static CACHE_REFRESHES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "geogate_rule_cache_refreshes_total",
        "Rule cache refreshes issued against the backend",
    )
    .expect("valid metric definition")
});

/// Register the cache counters with an application-level registry.
pub fn register_metrics(registry: &Registry) {
    let _ = registry.register(Box::new(CACHE_HITS.clone()));
    let _ = registry.register(Box::new(CACHE_REFRESHES.clone()));
}
