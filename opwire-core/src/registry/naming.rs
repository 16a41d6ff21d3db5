/// Deterministic operation naming: `prefix_namespace_identifier`, where the
/// identifier comes from the document's own operation id or is synthesized
/// from method + path. The same source always yields the same name.
pub fn operation_name(prefix: &str, namespace: &str, ident: &str) -> String {
    format!(
        "{}_{}_{}",
        sanitize_component(prefix),
        sanitize_component(namespace),
        sanitize_component(ident)
    )
}

/// Synthesize an identifier from method + path template, e.g.
/// `GET /things/{id}` becomes `get_things_by_id`.
pub fn synthesize_ident(method: &str, path: &str) -> String {
    let mut parts = vec![method.to_ascii_lowercase()];
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(param) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            parts.push(format!("by_{param}"));
        } else {
            parts.push(segment.to_string());
        }
    }
    parts
        .into_iter()
        .map(|p| sanitize_component(&p))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Fold anything outside `[A-Za-z0-9_]` to `_`, collapsing runs and trimming
/// the ends.
pub fn sanitize_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_sep = true;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}
