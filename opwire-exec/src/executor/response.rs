use std::collections::BTreeMap;

use crate::executor::result::RateLimitInfo;
use crate::retry::headers::get_header_ci;

/// Best-effort parse of admission-limit telemetry headers. Absence of any of
/// them is not an error; `None` means no telemetry at all was present.
pub(crate) fn extract_rate_limit(headers: &BTreeMap<String, String>) -> Option<RateLimitInfo> {
    let limit = parse_u64(headers, "x-ratelimit-limit");
    let remaining = parse_u64(headers, "x-ratelimit-remaining");
    let reset = get_header_ci(headers, "x-ratelimit-reset").map(|s| s.trim().to_string());

    if limit.is_none() && remaining.is_none() && reset.is_none() {
        return None;
    }
    Some(RateLimitInfo {
        limit,
        remaining,
        reset,
    })
}

fn parse_u64(headers: &BTreeMap<String, String>, name: &str) -> Option<u64> {
    get_header_ci(headers, name)?.trim().parse().ok()
}
