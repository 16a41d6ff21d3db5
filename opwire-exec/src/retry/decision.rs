use std::time::{Duration, SystemTime};

use crate::retry::config::RetryConfig;
use crate::retry::headers::parse_retry_after;
use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration, reason: RetryReason },
    Stop { reason: RetryReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    NotRetryable,
    AttemptsExhausted,
    HttpStatus(u16),
    NetworkFailure,
    RetryAfterHeader,
}

/// Decide if a failed attempt should be retried and how long to wait.
///
/// Retryable: explicit throttling (429), the server-error class (5xx), and
/// transport connectivity/timeout failures. Everything else stops
/// immediately. A `Retry-After` response header wins over the computed
/// backoff, clamped to the configured max.
///
/// - `attempt_no`: 1-based attempt number just completed.
/// - `now`: time source for HTTP-date `Retry-After` parsing.
/// - `rand_u64`: RNG for full jitter.
pub fn decide_retry(
    cfg: &RetryConfig,
    attempt_no: usize,
    error: &TransportError,
    now: SystemTime,
    rand_u64: impl Fn() -> u64,
) -> RetryDecision {
    let (status, headers) = match error {
        TransportError::Rejected {
            status, headers, ..
        } => {
            if !retryable_status(*status) {
                return RetryDecision::Stop {
                    reason: RetryReason::HttpStatus(*status),
                };
            }
            (Some(*status), Some(headers))
        }
        TransportError::Timeout | TransportError::Network(_) => (None, None),
        TransportError::Other(_) => {
            return RetryDecision::Stop {
                reason: RetryReason::NotRetryable,
            };
        }
    };

    if attempt_no >= cfg.max_attempts {
        return RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted,
        };
    }

    // Retry-After header wins.
    if let Some(h) = headers {
        if let Some(delay) = parse_retry_after(h, now) {
            return RetryDecision::RetryAfter {
                delay: clamp(delay, cfg.max_delay),
                reason: RetryReason::RetryAfterHeader,
            };
        }
    }

    // Exponential backoff: base * factor^(attempt_no-1), with full jitter.
    let exp = (attempt_no.saturating_sub(1)) as i32;
    let raw = (cfg.base_delay.as_millis() as f64) * cfg.factor.powi(exp);
    let raw_ms = raw.min(cfg.max_delay.as_millis() as f64).max(0.0) as u64;
    let jitter_ms = if raw_ms == 0 { 0 } else { rand_u64() % (raw_ms + 1) };

    RetryDecision::RetryAfter {
        delay: Duration::from_millis(jitter_ms),
        reason: status
            .map(RetryReason::HttpStatus)
            .unwrap_or(RetryReason::NetworkFailure),
    }
}

fn retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

fn clamp(delay: Duration, max: Duration) -> Duration {
    if delay > max { max } else { delay }
}
