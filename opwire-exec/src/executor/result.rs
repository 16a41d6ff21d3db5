use std::collections::BTreeMap;
use std::time::Duration;

use opwire_core::ParameterLocation;
use serde_json::Value;

use crate::transport::TransportError;

/// Caller-supplied inputs for one operation call.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    pub path_params: BTreeMap<String, Value>,
    pub query_params: BTreeMap<String, Value>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    /// Drive multi-page fetching when the operation supports it.
    pub paginate: bool,
    /// Page cap; clamped to the executor's hard ceiling.
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionResult {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    pub correlation_id: Option<String>,
    pub pagination: Option<PaginationMeta>,
    pub rate_limit: Option<RateLimitInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PaginationMeta {
    pub pages: usize,
    pub items: usize,
    /// Total the remote declared, reported without reconciling against
    /// `items`.
    pub total_declared: Option<u64>,
}

/// Best-effort admission telemetry parsed from rate-limit response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required {location} parameter '{name}'")]
    MissingParameter {
        name: String,
        location: ParameterLocation,
    },
    #[error("unresolved path placeholder '{name}'")]
    MissingPathParameter { name: String },
    #[error("unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Never retried; the transport is never invoked.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Dependency unhealthy; the call was never attempted.
    #[error("circuit open for '{key}', next probe in {retry_in:?}")]
    CircuitOpen { key: String, retry_in: Duration },
    /// Wire-level failure after retries were exhausted or not applicable.
    #[error(transparent)]
    Transport(TransportError),
    /// Remote answered with an error status; original status/body preserved.
    #[error("remote rejected with status {status}")]
    Remote {
        status: u16,
        headers: BTreeMap<String, String>,
        body: Option<Value>,
    },
}

impl ExecutionError {
    pub(crate) fn from_transport(err: TransportError) -> Self {
        match err {
            TransportError::Rejected {
                status,
                headers,
                body,
            } => ExecutionError::Remote {
                status,
                headers,
                body,
            },
            other => ExecutionError::Transport(other),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ExecutionError::Validation(_))
    }
}
