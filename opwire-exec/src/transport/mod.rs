mod http;
mod pool;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

pub use http::ReqwestTransport;
pub use pool::{ConnectionPool, InFlightGuard, PoolConfig, PoolStats};

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Parsed body: JSON when the payload is JSON, a string otherwise,
    /// absent for empty responses.
    pub body: Option<Value>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("connect/dns/tls error: {0}")]
    Network(String),
    #[error("remote returned status {status}")]
    Rejected {
        status: u16,
        headers: BTreeMap<String, String>,
        body: Option<Value>,
    },
    #[error("transport error: {0}")]
    Other(String),
}

/// The concrete signing/transport mechanism lives behind this trait; the
/// executor only decides which of the four calls to make. `path` is already
/// templated and percent-encoded.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    async fn retrieve(
        &self,
        path: &str,
        body: Option<&Value>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError>;

    async fn create(
        &self,
        path: &str,
        body: Option<&Value>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError>;

    async fn replace(
        &self,
        path: &str,
        body: Option<&Value>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError>;

    async fn remove(
        &self,
        path: &str,
        body: Option<&Value>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError>;
}
