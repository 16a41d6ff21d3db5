mod config;
mod decision;
pub(crate) mod headers;

pub use config::RetryConfig;
pub use decision::{decide_retry, RetryDecision, RetryReason};
pub use headers::parse_retry_after;
