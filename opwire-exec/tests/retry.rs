use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opwire_core::OperationEntry;
use opwire_exec::{
    ExecutionError, ExecutionRequest, Executor, ExecutorConfig, RateLimitConfig, RetryConfig,
    TransportAdapter, TransportError, TransportResponse,
};
use serde_json::{json, Value};

type Responder = dyn Fn(usize) -> Result<TransportResponse, TransportError> + Send + Sync;

struct CountingStub {
    attempts: AtomicUsize,
    respond: Box<Responder>,
}

impl CountingStub {
    fn with(
        respond: impl Fn(usize) -> Result<TransportResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<TransportResponse, TransportError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        (self.respond)(n)
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

fn rejected(status: u16) -> TransportError {
    TransportError::Rejected {
        status,
        headers: BTreeMap::new(),
        body: None,
    }
}

fn get_entry() -> OperationEntry {
    OperationEntry {
        name: "op_test_getThing".to_string(),
        method: "GET".to_string(),
        path: "/thing".to_string(),
        parameters: Vec::new(),
        request_body: None,
        pagination_param: None,
        summary: String::new(),
        namespace: "test".to_string(),
        base_path: Vec::new(),
    }
}

fn config(max_attempts: usize) -> ExecutorConfig {
    ExecutorConfig {
        retry: RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        },
        rate_limit: RateLimitConfig {
            capacity: 1000,
            refill_per_sec: 1000.0,
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn client_error_gets_a_single_attempt() {
    let stub = CountingStub::with(|_| Err(rejected(400)));
    let executor = Executor::new(stub.clone(), config(3));

    let err = executor
        .execute(&get_entry(), ExecutionRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExecutionError::Remote { status: 400, .. }));
    assert_eq!(stub.attempts(), 1);
    assert_eq!(executor.metrics().retries, 0);
}

#[tokio::test]
async fn server_error_is_retried_up_to_max_attempts() {
    let stub = CountingStub::with(|_| Err(rejected(503)));
    let executor = Executor::new(stub.clone(), config(3));

    let err = executor
        .execute(&get_entry(), ExecutionRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExecutionError::Remote { status: 503, .. }));
    assert_eq!(stub.attempts(), 3);
    assert_eq!(executor.metrics().retries, 2);
}

#[tokio::test]
async fn timeout_is_retried_and_surfaces_as_transport_failure() {
    let stub = CountingStub::with(|_| Err(TransportError::Timeout));
    let executor = Executor::new(stub.clone(), config(2));

    let err = executor
        .execute(&get_entry(), ExecutionRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExecutionError::Transport(TransportError::Timeout)
    ));
    assert_eq!(stub.attempts(), 2);
}

#[tokio::test]
async fn call_succeeds_after_transient_failure() {
    let stub = CountingStub::with(|n| {
        if n == 0 {
            Err(rejected(503))
        } else {
            Ok(TransportResponse {
                status: 200,
                headers: BTreeMap::new(),
                body: Some(json!({"ok": true})),
            })
        }
    });
    let executor = Executor::new(stub.clone(), config(3));

    let result = executor
        .execute(&get_entry(), ExecutionRequest::default())
        .await
        .unwrap();

    assert_eq!(result.status, 200);
    assert_eq!(result.body, json!({"ok": true}));
    assert_eq!(stub.attempts(), 2);
    assert_eq!(executor.metrics().retries, 1);
}
