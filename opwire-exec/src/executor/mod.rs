mod metrics;
mod paginate;
mod request;
mod response;
mod result;

use std::sync::Arc;
use std::time::SystemTime;

use opwire_core::OperationEntry;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

pub use metrics::{ExecutionMetrics, MetricsSnapshot};
pub use request::FORWARDABLE_HEADERS;
pub use result::{
    ExecutionError, ExecutionRequest, ExecutionResult, PaginationMeta, RateLimitInfo,
    ValidationError,
};

use crate::admission::{RateLimitConfig, RateLimiter};
use crate::breaker::{BreakerConfig, BreakerRegistry, BreakerStats};
use crate::cache::{CacheConfig, ResponseCache};
use crate::executor::request::{assemble, AssembledRequest};
use crate::retry::{decide_retry, RetryConfig, RetryDecision};
use crate::transport::{TransportAdapter, TransportError, TransportResponse};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    pub breaker: BreakerConfig,
    pub cache: CacheConfig,
    pub default_page_cap: usize,
    /// Hard ceiling on pages per call, whatever the caller asks for.
    pub page_ceiling: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            breaker: BreakerConfig::default(),
            cache: CacheConfig::default(),
            default_page_cap: 10,
            page_ceiling: 100,
        }
    }
}

impl ExecutorConfig {
    fn page_cap(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_cap)
            .clamp(1, self.page_ceiling.max(1))
    }
}

#[derive(Debug, Clone, Copy)]
enum MethodKind {
    Retrieve,
    Create,
    Replace,
    Remove,
}

fn method_kind(method: &str) -> Option<MethodKind> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Some(MethodKind::Retrieve),
        "POST" => Some(MethodKind::Create),
        "PUT" => Some(MethodKind::Replace),
        "DELETE" => Some(MethodKind::Remove),
        _ => None,
    }
}

/// Turns any registered operation plus caller parameters into a validated,
/// allowlisted, paginated, fault-tolerant call through the transport adapter.
/// Explicitly constructed and injected; tests build fresh instances.
pub struct Executor {
    adapter: Arc<dyn TransportAdapter>,
    config: ExecutorConfig,
    limiter: RateLimiter,
    breakers: BreakerRegistry,
    cache: Arc<ResponseCache>,
    metrics: ExecutionMetrics,
}

impl Executor {
    pub fn new(adapter: Arc<dyn TransportAdapter>, config: ExecutorConfig) -> Self {
        let limiter = RateLimiter::new(config.rate_limit.clone());
        let breakers = BreakerRegistry::new(config.breaker.clone());
        let cache = Arc::new(ResponseCache::new(config.cache.clone()));
        Self {
            adapter,
            config,
            limiter,
            breakers,
            cache,
            metrics: ExecutionMetrics::default(),
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn breaker_stats(&self) -> Vec<BreakerStats> {
        self.breakers.stats()
    }

    pub fn reset_breaker(&self, key: &str) {
        self.breakers.reset(key);
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn execute(
        &self,
        entry: &OperationEntry,
        request: ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        let Some(kind) = method_kind(&entry.method) else {
            return Err(ValidationError::UnsupportedMethod(entry.method.clone()).into());
        };
        let assembled = assemble(entry, &request)?;
        let correlation_id = Uuid::new_v4().to_string();
        let paginate = request.paginate && entry.paginatable();

        // Memoization applies only to single-page idempotent reads.
        let cacheable = matches!(kind, MethodKind::Retrieve) && !paginate;
        let cache_key = cacheable.then(|| {
            ResponseCache::key(
                &entry.name,
                &json!({ "path": assembled.path, "query": assembled.query }),
            )
        });
        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get(key) {
                self.metrics.record_cache_hit();
                debug!(operation = %entry.name, "serving cached response");
                return Ok(result_from_cached(cached, correlation_id));
            }
        }

        if paginate {
            return self
                .execute_paginated(entry, kind, assembled, &request, correlation_id)
                .await;
        }

        let resp = self
            .call_with_reliability(&entry.namespace, kind, &assembled)
            .await?;
        let rate_limit = response::extract_rate_limit(&resp.headers);
        let body = resp.body.unwrap_or(Value::Null);

        if let Some(key) = &cache_key {
            if (200..300).contains(&resp.status) {
                self.cache.set(
                    key,
                    json!({ "status": resp.status, "headers": resp.headers.clone(), "body": body.clone() }),
                    None,
                );
            }
        }

        Ok(ExecutionResult {
            status: resp.status,
            headers: resp.headers,
            body,
            correlation_id: Some(correlation_id),
            pagination: None,
            rate_limit,
        })
    }

    /// Strictly sequential page loop: page N+1 is never requested before page
    /// N's continuation signal is known. A failing page aborts the whole call
    /// and discards accumulated items.
    async fn execute_paginated(
        &self,
        entry: &OperationEntry,
        kind: MethodKind,
        assembled: AssembledRequest,
        request: &ExecutionRequest,
        correlation_id: String,
    ) -> Result<ExecutionResult, ExecutionError> {
        let cap = self.config.page_cap(request.max_pages);
        // Paginatability was checked by the caller of this fn.
        let cursor_param = entry.pagination_param.clone().unwrap_or_default();

        let mut items = Vec::<Value>::new();
        let mut cursor: Option<String> = None;
        let mut total_declared: Option<u64> = None;
        let mut pages = 0usize;
        let mut last_status = 0u16;
        let mut last_headers = Default::default();
        let mut rate_limit = None;

        loop {
            let mut page_request = assembled.clone();
            if let Some(c) = &cursor {
                page_request.query.insert(cursor_param.clone(), c.clone());
            }

            let resp = self
                .call_with_reliability(&entry.namespace, kind, &page_request)
                .await?;
            pages += 1;
            self.metrics.record_page();

            let body = resp.body.unwrap_or(Value::Null);
            if let Some(batch) = paginate::extract_items(&body) {
                items.extend(batch);
            }
            if total_declared.is_none() {
                total_declared = paginate::declared_total(&body);
            }
            rate_limit = response::extract_rate_limit(&resp.headers).or(rate_limit);
            last_status = resp.status;
            last_headers = resp.headers;

            match paginate::continuation(&body) {
                Some(next) if pages < cap => cursor = next.cursor.or(cursor),
                _ => break,
            }
        }

        let item_count = items.len();
        Ok(ExecutionResult {
            status: last_status,
            headers: last_headers,
            body: Value::Array(items),
            correlation_id: Some(correlation_id),
            pagination: Some(PaginationMeta {
                pages,
                items: item_count,
                total_declared,
            }),
            rate_limit,
        })
    }

    /// One logical call through the reliability layer: admission pacing, then
    /// the per-dependency circuit gate, then the transport attempt; failures
    /// are classified and retried with backoff. Every attempt is paced and
    /// gated individually, and every outcome feeds the breaker.
    async fn call_with_reliability(
        &self,
        breaker_key: &str,
        kind: MethodKind,
        assembled: &AssembledRequest,
    ) -> Result<TransportResponse, ExecutionError> {
        let breaker = self.breakers.breaker(breaker_key);
        let mut attempt = 1usize;
        loop {
            self.limiter.acquire().await;
            breaker.try_acquire().map_err(|retry_in| {
                self.metrics.record_breaker_rejection();
                ExecutionError::CircuitOpen {
                    key: breaker_key.to_string(),
                    retry_in,
                }
            })?;

            self.metrics.record_request();
            match self.dispatch(kind, assembled).await {
                Ok(resp) => {
                    breaker.record_success();
                    return Ok(resp);
                }
                Err(err) => {
                    breaker.record_failure();
                    self.metrics.record_transport_error();
                    let decision = decide_retry(
                        &self.config.retry,
                        attempt,
                        &err,
                        SystemTime::now(),
                        || fastrand::u64(..),
                    );
                    match decision {
                        RetryDecision::RetryAfter { delay, reason } => {
                            debug!(attempt, ?reason, ?delay, "retrying failed call");
                            self.metrics.record_retry();
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        RetryDecision::Stop { .. } => {
                            return Err(ExecutionError::from_transport(err));
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(
        &self,
        kind: MethodKind,
        assembled: &AssembledRequest,
    ) -> Result<TransportResponse, TransportError> {
        let query = (!assembled.query.is_empty()).then_some(&assembled.query);
        let headers = (!assembled.headers.is_empty()).then_some(&assembled.headers);
        let body = assembled.body.as_ref();
        match kind {
            MethodKind::Retrieve => {
                self.adapter
                    .retrieve(&assembled.path, body, query, headers)
                    .await
            }
            MethodKind::Create => {
                self.adapter
                    .create(&assembled.path, body, query, headers)
                    .await
            }
            MethodKind::Replace => {
                self.adapter
                    .replace(&assembled.path, body, query, headers)
                    .await
            }
            MethodKind::Remove => {
                self.adapter
                    .remove(&assembled.path, body, query, headers)
                    .await
            }
        }
    }
}

fn result_from_cached(cached: Value, correlation_id: String) -> ExecutionResult {
    let status = cached
        .get("status")
        .and_then(Value::as_u64)
        .unwrap_or(200) as u16;
    let headers = cached
        .get("headers")
        .and_then(Value::as_object)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();
    let body = cached.get("body").cloned().unwrap_or(Value::Null);
    ExecutionResult {
        status,
        headers,
        body,
        correlation_id: Some(correlation_id),
        pagination: None,
        rate_limit: None,
    }
}
