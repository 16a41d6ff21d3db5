use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Failures inside the rolling window that trip the circuit.
    pub failure_threshold: usize,
    /// Rolling window the failure timestamps are pruned to.
    pub window: Duration,
    /// How long an open circuit rejects before allowing a probe.
    pub open_timeout: Duration,
    /// Consecutive half-open successes required to close.
    pub success_threshold: usize,
    /// Probe calls allowed through a half-open circuit at once.
    pub half_open_max_probes: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            open_timeout: Duration::from_secs(30),
            success_threshold: 2,
            half_open_max_probes: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BreakerStats {
    pub key: String,
    pub state: CircuitState,
    pub failures_in_window: usize,
    pub failure_count: u64,
    pub success_count: u64,
    pub total_calls: u64,
    pub rejected_calls: u64,
    pub last_transition: Option<Duration>,
}

/// Per-dependency-key health gate. Transitions are driven only by recorded
/// call outcomes or an explicit manual reset; all mutation happens under one
/// short-lived lock, never across a network call.
pub struct CircuitBreaker {
    key: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

struct Inner {
    state: CircuitState,
    failures: VecDeque<Instant>,
    consecutive_successes: usize,
    probes_in_flight: usize,
    open_until: Option<Instant>,
    failure_count: u64,
    success_count: u64,
    total_calls: u64,
    rejected_calls: u64,
    last_transition: Option<Instant>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: VecDeque::new(),
            consecutive_successes: 0,
            probes_in_flight: 0,
            open_until: None,
            failure_count: 0,
            success_count: 0,
            total_calls: 0,
            rejected_calls: 0,
            last_transition: None,
        }
    }
}

impl CircuitBreaker {
    pub fn new(key: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            key: key.into(),
            config,
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Gate one call. `Err` carries the time until the next probe is allowed;
    /// the underlying call must not be attempted.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.total_calls += 1;
                Ok(())
            }
            CircuitState::Open => {
                let until = inner.open_until.unwrap_or(now);
                if now >= until {
                    // First call after the timeout becomes the probe.
                    self.transition(&mut inner, CircuitState::HalfOpen, now);
                    inner.probes_in_flight = 1;
                    inner.total_calls += 1;
                    Ok(())
                } else {
                    inner.rejected_calls += 1;
                    Err(until - now)
                }
            }
            CircuitState::HalfOpen => {
                if inner.probes_in_flight < self.config.half_open_max_probes {
                    inner.probes_in_flight += 1;
                    inner.total_calls += 1;
                    Ok(())
                } else {
                    inner.rejected_calls += 1;
                    Err(self.config.open_timeout)
                }
            }
        }
    }

    pub fn record_success(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.success_count += 1;
        if inner.state == CircuitState::HalfOpen {
            inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
            inner.consecutive_successes += 1;
            if inner.consecutive_successes >= self.config.success_threshold {
                inner.failures.clear();
                inner.open_until = None;
                self.transition(&mut inner, CircuitState::Closed, now);
            }
        }
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.failure_count += 1;
        inner.consecutive_successes = 0;
        match inner.state {
            CircuitState::Closed => {
                inner.failures.push_back(now);
                let cutoff = now.checked_sub(self.config.window);
                while inner
                    .failures
                    .front()
                    .zip(cutoff)
                    .map(|(t, c)| *t < c)
                    .unwrap_or(false)
                {
                    inner.failures.pop_front();
                }
                if inner.failures.len() >= self.config.failure_threshold {
                    inner.open_until = Some(now + self.config.open_timeout);
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => {
                // One failed probe re-opens and restarts the timeout.
                inner.probes_in_flight = 0;
                inner.open_until = Some(now + self.config.open_timeout);
                self.transition(&mut inner, CircuitState::Open, now);
            }
            CircuitState::Open => {}
        }
    }

    /// Force CLOSED regardless of history.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.failures.clear();
        inner.consecutive_successes = 0;
        inner.probes_in_flight = 0;
        inner.open_until = None;
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed, now);
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn stats(&self) -> BreakerStats {
        let inner = self.lock();
        BreakerStats {
            key: self.key.clone(),
            state: inner.state,
            failures_in_window: inner.failures.len(),
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_calls: inner.total_calls,
            rejected_calls: inner.rejected_calls,
            last_transition: inner.last_transition.map(|t| t.elapsed()),
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        if to == CircuitState::Open {
            warn!(key = %self.key, "circuit opened");
        } else {
            info!(key = %self.key, state = ?to, "circuit transition");
        }
        inner.state = to;
        inner.last_transition = Some(now);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Hands out one breaker per dependency key; independent keys share nothing
/// but the map lookup.
pub struct BreakerRegistry {
    config: BreakerConfig,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn breaker(&self, key: &str) -> Arc<CircuitBreaker> {
        let mut map = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(key, self.config.clone())))
            .clone()
    }

    pub fn reset(&self, key: &str) {
        if let Some(b) = self
            .breakers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
        {
            b.reset();
        }
    }

    pub fn stats(&self) -> Vec<BreakerStats> {
        let map = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        let mut stats: Vec<BreakerStats> = map.values().map(|b| b.stats()).collect();
        stats.sort_by(|a, b| a.key.cmp(&b.key));
        stats
    }
}
