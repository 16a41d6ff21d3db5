use crate::registry::entry::{ParameterDescriptor, ParameterLocation};

/// Query parameter names that mark an operation as paginatable, matched as
/// case-insensitive substrings. False negatives are accepted over false
/// positives; the vocabulary is fixed and documented.
const PAGINATION_MARKERS: [&str; 4] = ["cursor", "offset", "page", "limit"];

/// Pick the query parameter the pagination cursor merges into, if any.
///
/// When several parameters match, the best-ranked marker wins
/// (cursor > offset > page > limit), so `cursor`-style parameters are
/// preferred over plain page-size knobs. Pure; replaceable with a
/// declarative override table without touching the executor.
pub fn detect_pagination_param(params: &[ParameterDescriptor]) -> Option<&ParameterDescriptor> {
    let mut best: Option<(usize, &ParameterDescriptor)> = None;
    for p in params {
        if p.location != ParameterLocation::Query {
            continue;
        }
        let lower = p.name.to_ascii_lowercase();
        let Some(rank) = PAGINATION_MARKERS.iter().position(|m| lower.contains(m)) else {
            continue;
        };
        if best.map(|(r, _)| rank < r).unwrap_or(true) {
            best = Some((rank, p));
        }
    }
    best.map(|(_, p)| p)
}
