#![forbid(unsafe_code)]

//! Universal executor for operations indexed by `opwire-core`, wrapped in a
//! reliability layer: retry with backoff, token-bucket admission, per-key
//! circuit breaking, connection reuse, and response caching.

pub mod admission;
pub mod breaker;
pub mod cache;
pub mod executor;
pub mod retry;
pub mod transport;

pub use crate::admission::{RateLimitConfig, RateLimiter};
pub use crate::breaker::{BreakerConfig, BreakerRegistry, BreakerStats, CircuitBreaker, CircuitState};
pub use crate::cache::{CacheConfig, CacheStats, ResponseCache};
pub use crate::executor::{
    ExecutionError, ExecutionRequest, ExecutionResult, Executor, ExecutorConfig, MetricsSnapshot,
    PaginationMeta, RateLimitInfo, ValidationError,
};
pub use crate::retry::{decide_retry, RetryConfig, RetryDecision, RetryReason};
pub use crate::transport::{
    ConnectionPool, PoolConfig, PoolStats, ReqwestTransport, TransportAdapter, TransportError,
    TransportResponse,
};
