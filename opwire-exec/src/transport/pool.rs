use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Idle sockets kept alive per host.
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub tcp_keepalive: Duration,
    /// Soft bound used for utilization accounting, not enforcement; the
    /// transport layer owns the sockets.
    pub max_in_flight: usize,
    /// Utilization above which a warning is logged.
    pub warn_utilization: f64,
    pub request_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 8,
            idle_timeout: Duration::from_secs(90),
            tcp_keepalive: Duration::from_secs(60),
            max_in_flight: 64,
            warn_utilization: 0.8,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PoolStats {
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub max_in_flight: usize,
    pub total_requests: u64,
    pub utilization: f64,
}

/// Keep-alive connection pool around a shared `reqwest::Client`, with
/// read-only in-flight accounting. `prune` recycles idle sockets by swapping
/// in a freshly built client; old connections close once their last clone
/// drops.
pub struct ConnectionPool {
    config: PoolConfig,
    client: Mutex<reqwest::Client>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    total_requests: AtomicU64,
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        let client = build_client(&config);
        Self {
            config,
            client: Mutex::new(client),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            total_requests: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn client(&self) -> reqwest::Client {
        self.client
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Account one in-flight request; the guard decrements on drop.
    pub fn track(self: &Arc<Self>) -> InFlightGuard {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);
        let utilization = current as f64 / self.config.max_in_flight.max(1) as f64;
        if utilization > self.config.warn_utilization {
            warn!(
                in_flight = current,
                max = self.config.max_in_flight,
                "connection pool utilization high"
            );
        }
        InFlightGuard {
            pool: Arc::clone(self),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let in_flight = self.in_flight.load(Ordering::SeqCst);
        PoolStats {
            in_flight,
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
            max_in_flight: self.config.max_in_flight,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            utilization: in_flight as f64 / self.config.max_in_flight.max(1) as f64,
        }
    }

    /// Recycle idle connections.
    pub fn prune(&self) {
        let fresh = build_client(&self.config);
        *self.client.lock().unwrap_or_else(|e| e.into_inner()) = fresh;
    }
}

pub struct InFlightGuard {
    pool: Arc<ConnectionPool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.pool.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn build_client(config: &PoolConfig) -> reqwest::Client {
    // Client creation should never fail in practice; failing loudly at
    // construction beats erroring on every later call.
    reqwest::Client::builder()
        .pool_max_idle_per_host(config.max_idle_per_host)
        .pool_idle_timeout(config.idle_timeout)
        .tcp_keepalive(config.tcp_keepalive)
        .timeout(config.request_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("opwire/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            panic!("failed to create HTTP client: {e}. This is a bug - please report it.");
        })
}
