use std::collections::BTreeMap;

use opwire_core::{OperationEntry, ParameterLocation};
use serde_json::Value;
use tracing::warn;

use crate::executor::result::{ExecutionRequest, ValidationError};

/// Headers the executor will forward. Anything else a caller supplies is
/// dropped with a logged trace, never sent.
pub const FORWARDABLE_HEADERS: &[&str] = &[
    "accept",
    "accept-language",
    "authorization",
    "cache-control",
    "content-type",
    "if-match",
    "if-none-match",
    "user-agent",
    "x-api-key",
    "x-correlation-id",
    "x-request-id",
];

#[derive(Debug, Clone)]
pub(crate) struct AssembledRequest {
    /// Base-path + templated operation path, placeholders substituted.
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Merged auto-injected and caller headers, lowercase names.
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

/// Build the wire-level request. Headers come first (auto-injected, then
/// caller values through the allowlist) so requirement validation sees the
/// merged set; path substitution and query stringification follow.
pub(crate) fn assemble(
    entry: &OperationEntry,
    request: &ExecutionRequest,
) -> Result<AssembledRequest, ValidationError> {
    let mut headers = BTreeMap::<String, String>::new();
    if request.body.is_some() {
        headers.insert("content-type".to_string(), "application/json".to_string());
    }
    for p in entry.parameters_in(ParameterLocation::Header) {
        if let Some(default) = &p.default {
            headers.insert(p.name.to_ascii_lowercase(), stringify(default));
        }
    }
    for (name, value) in &request.headers {
        let lower = name.to_ascii_lowercase();
        if FORWARDABLE_HEADERS.contains(&lower.as_str()) {
            headers.insert(lower, value.clone());
        } else {
            warn!(header = %name, operation = %entry.name, "dropping non-allowlisted header");
        }
    }

    // Required-ness is checked against the merged header set, so an
    // auto-injected header satisfies its own requirement.
    for p in &entry.parameters {
        if !p.required {
            continue;
        }
        let present = match p.location {
            ParameterLocation::Path => request.path_params.contains_key(&p.name),
            ParameterLocation::Query => request.query_params.contains_key(&p.name),
            ParameterLocation::Header => headers.contains_key(&p.name.to_ascii_lowercase()),
        };
        if !present {
            return Err(ValidationError::MissingParameter {
                name: p.name.clone(),
                location: p.location,
            });
        }
    }

    let mut path = entry.full_path();
    for (name, value) in &request.path_params {
        path = path.replace(
            &format!("{{{name}}}"),
            &urlencoding::encode(&stringify(value)),
        );
    }
    if let Some(name) = remaining_placeholder(&path) {
        return Err(ValidationError::MissingPathParameter {
            name: name.to_string(),
        });
    }

    let query = request
        .query_params
        .iter()
        .map(|(k, v)| (k.clone(), stringify(v)))
        .collect();

    Ok(AssembledRequest {
        path,
        query,
        headers,
        body: request.body.clone(),
    })
}

/// Scalars stringify bare; arrays and objects as compact JSON.
pub(crate) fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn remaining_placeholder(path: &str) -> Option<&str> {
    let rest = &path[path.find('{')? + 1..];
    rest.split('}').next().filter(|s| !s.is_empty())
}
