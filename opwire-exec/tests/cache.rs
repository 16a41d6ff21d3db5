use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opwire_core::OperationEntry;
use opwire_exec::{
    CacheConfig, ExecutionRequest, Executor, ExecutorConfig, RateLimitConfig, ResponseCache,
    TransportAdapter, TransportError, TransportResponse,
};
use serde_json::{json, Value};

#[test]
fn zero_ttl_set_then_get_is_a_miss() {
    let cache = ResponseCache::new(CacheConfig::default());
    cache.set("k", json!({"v": 1}), Some(Duration::ZERO));
    assert_eq!(cache.get("k"), None);

    let stats = cache.stats();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.evictions, 1);
}

#[test]
fn in_window_get_returns_the_exact_value() {
    let cache = ResponseCache::new(CacheConfig::default());
    let value = json!({"id": "42", "tags": ["a", "b"]});
    cache.set("k", value.clone(), Some(Duration::from_secs(60)));

    assert_eq!(cache.get("k"), Some(value));
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn over_capacity_insert_evicts_only_the_least_recently_used() {
    let cache = ResponseCache::new(CacheConfig {
        max_entries: 2,
        ..Default::default()
    });
    cache.set("a", json!(1), None);
    std::thread::sleep(Duration::from_millis(5));
    cache.set("b", json!(2), None);
    std::thread::sleep(Duration::from_millis(5));

    // Touch "a" so "b" becomes the LRU entry.
    assert_eq!(cache.get("a"), Some(json!(1)));
    cache.set("c", json!(3), None);

    assert_eq!(cache.get("b"), None);
    assert_eq!(cache.get("a"), Some(json!(1)));
    assert_eq!(cache.get("c"), Some(json!(3)));
    assert_eq!(cache.stats().entries, 2);
}

#[test]
fn sweep_purges_expired_entries_only() {
    let cache = ResponseCache::new(CacheConfig::default());
    cache.set("stale", json!(1), Some(Duration::ZERO));
    cache.set("fresh", json!(2), Some(Duration::from_secs(60)));

    assert_eq!(cache.sweep(), 1);
    assert_eq!(cache.stats().entries, 1);
    assert_eq!(cache.get("fresh"), Some(json!(2)));
}

#[tokio::test]
async fn background_sweeper_purges_independent_of_reads() {
    let cache = Arc::new(ResponseCache::new(CacheConfig {
        sweep_interval: Duration::from_millis(20),
        ..Default::default()
    }));
    cache.set("stale", json!(1), Some(Duration::ZERO));

    let handle = cache.spawn_sweeper();
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(cache.stats().entries, 0);
    handle.abort();
}

struct CountingStub {
    calls: AtomicUsize,
}

impl CountingStub {
    fn next(&self) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransportResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: Some(json!({"fetched": true})),
        })
    }
}

#[async_trait]
impl TransportAdapter for CountingStub {
    async fn retrieve(
        &self,
        _path: &str,
        _body: Option<&Value>,
        _query: Option<&BTreeMap<String, String>>,
        _headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError> {
        self.next()
    }

    async fn create(
        &self,
        _path: &str,
        _body: Option<&Value>,
        _query: Option<&BTreeMap<String, String>>,
        _headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError> {
        self.next()
    }

    async fn replace(
        &self,
        _path: &str,
        _body: Option<&Value>,
        _query: Option<&BTreeMap<String, String>>,
        _headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError> {
        self.next()
    }

    async fn remove(
        &self,
        _path: &str,
        _body: Option<&Value>,
        _query: Option<&BTreeMap<String, String>>,
        _headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError> {
        self.next()
    }
}

fn entry(method: &str) -> OperationEntry {
    OperationEntry {
        name: format!("op_test_{}", method.to_ascii_lowercase()),
        method: method.to_string(),
        path: "/things".to_string(),
        parameters: Vec::new(),
        request_body: None,
        pagination_param: None,
        summary: String::new(),
        namespace: "test".to_string(),
        base_path: Vec::new(),
    }
}

fn config() -> ExecutorConfig {
    ExecutorConfig {
        rate_limit: RateLimitConfig {
            capacity: 1000,
            refill_per_sec: 1000.0,
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn repeated_read_is_served_from_cache() {
    let stub = Arc::new(CountingStub {
        calls: AtomicUsize::new(0),
    });
    let executor = Executor::new(stub.clone(), config());
    let op = entry("GET");

    let first = executor
        .execute(&op, ExecutionRequest::default())
        .await
        .unwrap();
    let second = executor
        .execute(&op, ExecutionRequest::default())
        .await
        .unwrap();

    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.body, second.body);
    assert_eq!(second.status, 200);
    assert_eq!(executor.metrics().cache_hits, 1);
    assert_eq!(executor.cache().stats().entries, 1);
}

#[tokio::test]
async fn non_read_calls_are_never_cached() {
    let stub = Arc::new(CountingStub {
        calls: AtomicUsize::new(0),
    });
    let executor = Executor::new(stub.clone(), config());
    let op = entry("POST");

    executor
        .execute(&op, ExecutionRequest::default())
        .await
        .unwrap();
    executor
        .execute(&op, ExecutionRequest::default())
        .await
        .unwrap();

    assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    assert_eq!(executor.cache().stats().entries, 0);
}

#[tokio::test]
async fn different_parameters_use_different_cache_keys() {
    let stub = Arc::new(CountingStub {
        calls: AtomicUsize::new(0),
    });
    let executor = Executor::new(stub.clone(), config());
    let op = entry("GET");

    let mut request = ExecutionRequest::default();
    request.query_params.insert("q".to_string(), json!("a"));
    executor.execute(&op, request).await.unwrap();

    let mut request = ExecutionRequest::default();
    request.query_params.insert("q".to_string(), json!("b"));
    executor.execute(&op, request).await.unwrap();

    assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    assert_eq!(executor.cache().stats().entries, 2);
}
