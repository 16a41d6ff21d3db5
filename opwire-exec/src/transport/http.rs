use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::pool::ConnectionPool;
use crate::transport::{TransportAdapter, TransportError, TransportResponse};

/// Default adapter: unsigned HTTPS via the shared connection pool. Deployments
/// with request signing supply their own [`TransportAdapter`] instead.
pub struct ReqwestTransport {
    base_url: url::Url,
    pool: Arc<ConnectionPool>,
}

impl ReqwestTransport {
    pub fn new(base_url: url::Url, pool: Arc<ConnectionPool>) -> Self {
        Self { base_url, pool }
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError> {
        let mut url = self.base_url.clone();
        url.set_path(path);
        if let Some(query) = query {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }

        let _guard = self.pool.track();
        let mut rb = self.pool.client().request(method, url);
        if let Some(headers) = headers {
            for (k, v) in headers {
                rb = rb.header(k, v);
            }
        }
        if let Some(body) = body {
            rb = rb.json(body);
        }

        let resp = rb.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();

        let mut resp_headers = BTreeMap::new();
        for (k, v) in resp.headers().iter() {
            if let Ok(s) = v.to_str() {
                resp_headers.insert(k.to_string(), s.to_string());
            }
        }

        let text = resp.text().await.map_err(map_reqwest_error)?;
        let body = parse_body(&text);

        if status >= 400 {
            return Err(TransportError::Rejected {
                status,
                headers: resp_headers,
                body,
            });
        }

        Ok(TransportResponse {
            status,
            headers: resp_headers,
            body,
        })
    }
}

#[async_trait]
impl TransportAdapter for ReqwestTransport {
    async fn retrieve(
        &self,
        path: &str,
        body: Option<&Value>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError> {
        self.send(reqwest::Method::GET, path, body, query, headers).await
    }

    async fn create(
        &self,
        path: &str,
        body: Option<&Value>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError> {
        self.send(reqwest::Method::POST, path, body, query, headers).await
    }

    async fn replace(
        &self,
        path: &str,
        body: Option<&Value>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError> {
        self.send(reqwest::Method::PUT, path, body, query, headers).await
    }

    async fn remove(
        &self,
        path: &str,
        body: Option<&Value>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<TransportResponse, TransportError> {
        self.send(reqwest::Method::DELETE, path, body, query, headers).await
    }
}

fn parse_body(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(v) => Some(v),
        Err(_) => Some(Value::String(text.to_string())),
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        return TransportError::Timeout;
    }
    if e.is_connect() || e.is_request() {
        return TransportError::Network(e.to_string());
    }
    TransportError::Other(e.to_string())
}
