use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::warn;

/// Marker key substituted for a `$ref` that closes a cycle. Carries the
/// offending reference string as its value.
pub const SELF_REFERENCE_KEY: &str = "x-self-reference";

#[derive(Debug, Clone, thiserror::Error)]
pub enum RefError {
    #[error("unresolvable $ref: {0}")]
    NotFound(String),
    #[error("$ref points outside the document set: {0}")]
    UnknownDocument(String),
    #[error("malformed $ref: {0}")]
    Malformed(String),
}

/// Inline every `$ref` in `doc_name` against the documents of one namespace.
///
/// References may point within the document (`#/components/...`) or into a
/// sibling document (`common#/components/...`, with or without a file
/// extension on the left side). Cycles are broken by substituting a
/// self-reference placeholder object and logging; unresolvable references
/// are replaced by the placeholder as well and reported as diagnostics so
/// the rest of the document still loads.
pub fn inline_refs(docs: &BTreeMap<String, Value>, doc_name: &str) -> (Value, Vec<String>) {
    let mut diagnostics = Vec::new();
    let Some(root) = docs.get(doc_name) else {
        return (Value::Null, vec![format!("document '{doc_name}' missing from set")]);
    };
    let mut stack = Vec::new();
    let inlined = inline_value(docs, doc_name, root, &mut stack, &mut diagnostics);
    (inlined, diagnostics)
}

fn inline_value(
    docs: &BTreeMap<String, Value>,
    current_doc: &str,
    value: &Value,
    stack: &mut Vec<String>,
    diagnostics: &mut Vec<String>,
) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(ref_str) = map.get("$ref").and_then(|v| v.as_str()) {
                return inline_ref(docs, current_doc, ref_str, stack, diagnostics);
            }
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), inline_value(docs, current_doc, v, stack, diagnostics));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(
            arr.iter()
                .map(|v| inline_value(docs, current_doc, v, stack, diagnostics))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn inline_ref(
    docs: &BTreeMap<String, Value>,
    current_doc: &str,
    ref_str: &str,
    stack: &mut Vec<String>,
    diagnostics: &mut Vec<String>,
) -> Value {
    let (target_doc, pointer) = match split_ref(current_doc, ref_str) {
        Ok(parts) => parts,
        Err(e) => {
            diagnostics.push(e.to_string());
            return placeholder(ref_str);
        }
    };

    // The visited set is keyed by "document#pointer" so mutually-referencing
    // documents cannot recurse unbounded either.
    let key = format!("{target_doc}#{pointer}");
    if stack.contains(&key) {
        warn!(reference = ref_str, "breaking reference cycle");
        return placeholder(ref_str);
    }

    let Some(doc) = docs.get(&target_doc) else {
        diagnostics.push(RefError::UnknownDocument(ref_str.to_string()).to_string());
        return placeholder(ref_str);
    };
    let Some(resolved) = doc.pointer(&pointer) else {
        diagnostics.push(RefError::NotFound(ref_str.to_string()).to_string());
        return placeholder(ref_str);
    };

    stack.push(key);
    let inlined = inline_value(docs, &target_doc, resolved, stack, diagnostics);
    stack.pop();
    inlined
}

fn split_ref(current_doc: &str, ref_str: &str) -> Result<(String, String), RefError> {
    let Some((left, pointer)) = ref_str.split_once('#') else {
        return Err(RefError::Malformed(ref_str.to_string()));
    };
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(RefError::Malformed(ref_str.to_string()));
    }
    let doc = if left.is_empty() {
        current_doc.to_string()
    } else {
        // Sibling-document reference: addressed by file stem.
        std::path::Path::new(left)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| RefError::Malformed(ref_str.to_string()))?
    };
    Ok((doc, pointer.to_string()))
}

fn placeholder(ref_str: &str) -> Value {
    json!({ SELF_REFERENCE_KEY: ref_str })
}
