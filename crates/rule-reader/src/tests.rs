use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use geogate_rule_model::{DimensionFilter, GrantType, RuleFilter, RuleRecord};

use crate::cache::RuleCache;
use crate::reader::{CachedRuleReader, RuleReader};
use crate::store::{InMemoryRuleBackend, RuleBackend, RuleQuery, StoreError};

struct CountingBackend {
    inner: InMemoryRuleBackend,
    calls: AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
}

impl CountingBackend {
    fn new(rules: Vec<RuleRecord>) -> Self {
        Self {
            inner: InMemoryRuleBackend::new(rules),
            calls: AtomicUsize::new(0),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleBackend for CountingBackend {
    async fn search(&self, query: &RuleQuery) -> Result<Vec<RuleRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("backend down".into()));
        }
        self.inner.search(query).await
    }
}

fn states_filter() -> RuleFilter {
    let mut filter = RuleFilter::any();
    filter.workspace = DimensionFilter::name("topp");
    filter.layer = DimensionFilter::name("states");
    filter
}

fn states_rule(id: u64) -> RuleRecord {
    RuleRecord::new(id, 0, GrantType::Allow)
        .with_workspace("topp")
        .with_layer("states")
}

#[tokio::test]
async fn lookups_within_ttl_share_one_backend_query() {
    let backend = Arc::new(CountingBackend::new(vec![states_rule(1)]));
    let cache = RuleCache::with_ttl(Arc::clone(&backend) as Arc<dyn RuleBackend>, Duration::from_secs(30), 16);

    let query = RuleQuery::Matching(states_filter());
    let first = cache.search(&query).await.expect("first lookup");
    let second = cache.search(&query).await.expect("second lookup");

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn lookup_after_ttl_refreshes_from_backend() {
    let backend = Arc::new(CountingBackend::new(vec![states_rule(1)]));
    let cache = RuleCache::with_ttl(
        Arc::clone(&backend) as Arc<dyn RuleBackend>,
        Duration::from_millis(40),
        16,
    );

    let query = RuleQuery::Matching(states_filter());
    cache.search(&query).await.expect("initial lookup");
    tokio::time::sleep(Duration::from_millis(60)).await;
    cache.search(&query).await.expect("stale lookup");

    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn concurrent_same_key_lookups_issue_one_query() {
    let backend = Arc::new(CountingBackend::new(vec![states_rule(1)]));
    let cache = Arc::new(RuleCache::with_ttl(
        Arc::clone(&backend) as Arc<dyn RuleBackend>,
        Duration::from_secs(30),
        16,
    ));

    let query = RuleQuery::Matching(states_filter());
    let (left, right) = tokio::join!(cache.search(&query), cache.search(&query));
    left.expect("left lookup");
    right.expect("right lookup");

    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn structurally_equal_queries_share_an_entry() {
    let backend = Arc::new(CountingBackend::new(vec![states_rule(1)]));
    let cache = RuleCache::with_ttl(Arc::clone(&backend) as Arc<dyn RuleBackend>, Duration::from_secs(30), 16);

    cache
        .search(&RuleQuery::Matching(states_filter()))
        .await
        .expect("first lookup");
    // Rebuilt from scratch at another call site, still the same key.
    cache
        .search(&RuleQuery::Matching(states_filter()))
        .await
        .expect("second lookup");

    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn capacity_bound_evicts_least_recently_refreshed() {
    let backend = Arc::new(CountingBackend::new(vec![states_rule(1)]));
    let cache = RuleCache::with_ttl(Arc::clone(&backend) as Arc<dyn RuleBackend>, Duration::from_secs(30), 2);

    let mut first = RuleFilter::any();
    first.layer = DimensionFilter::name("one");
    let mut second = RuleFilter::any();
    second.layer = DimensionFilter::name("two");
    let mut third = RuleFilter::any();
    third.layer = DimensionFilter::name("three");

    cache.search(&RuleQuery::Matching(first.clone())).await.expect("one");
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.search(&RuleQuery::Matching(second)).await.expect("two");
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.search(&RuleQuery::Matching(third)).await.expect("three");
    assert_eq!(backend.calls(), 3);

    // The first key was refreshed longest ago and must have been dropped.
    cache.search(&RuleQuery::Matching(first)).await.expect("one again");
    assert_eq!(backend.calls(), 4);
}

#[tokio::test]
async fn backend_failure_propagates() {
    let backend = Arc::new(CountingBackend::new(vec![states_rule(1)]));
    backend.fail.store(true, Ordering::SeqCst);
    let cache = RuleCache::new(Arc::clone(&backend) as Arc<dyn RuleBackend>);

    let result = cache.search(&RuleQuery::Matching(states_filter())).await;
    assert!(matches!(result, Err(StoreError::Unavailable(_))));
}

#[tokio::test]
async fn reader_resolves_the_most_specific_rule() {
    let backend = Arc::new(InMemoryRuleBackend::new(vec![
        RuleRecord::new(1, 0, GrantType::Deny),
        states_rule(2).with_cql_read("POPULATION > 1000000"),
    ]));
    let reader = CachedRuleReader::new(RuleCache::new(backend));

    let access = reader
        .access_info(&states_filter())
        .await
        .expect("lookup succeeds")
        .expect("a rule matches");
    assert_eq!(access.grant, GrantType::Allow);
    assert_eq!(access.cql_filter_read.as_deref(), Some("POPULATION > 1000000"));
}

#[tokio::test]
async fn reader_yields_none_without_a_match() {
    let backend = Arc::new(InMemoryRuleBackend::new(vec![
        RuleRecord::new(1, 0, GrantType::Allow).with_user("alice")
    ]));
    let reader = CachedRuleReader::new(RuleCache::new(backend));

    let mut filter = RuleFilter::any();
    filter.user = DimensionFilter::Default;
    let access = reader.access_info(&filter).await.expect("lookup succeeds");
    assert!(access.is_none());
}

#[tokio::test]
async fn list_all_returns_every_rule() {
    let backend = Arc::new(InMemoryRuleBackend::new(vec![
        states_rule(1),
        RuleRecord::new(2, 1, GrantType::Deny).with_workspace("nurc"),
    ]));
    let reader = CachedRuleReader::new(RuleCache::new(backend));

    let rules = reader.list_all().await.expect("list succeeds");
    assert_eq!(rules.len(), 2);
}
