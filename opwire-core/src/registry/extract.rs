use serde_json::Value;

use crate::registry::entry::{
    dedupe_params, location_from_str, OperationEntry, ParameterDescriptor, ParameterLocation,
};
use crate::registry::naming::{operation_name, synthesize_ident};
use crate::registry::pagination::detect_pagination_param;
use crate::schema::shape_of;

pub(crate) const METHOD_KEYS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

pub(crate) struct DocumentOutcome {
    pub entries: Vec<OperationEntry>,
    pub diagnostics: Vec<String>,
}

/// Emit one entry per declared path × method of an already `$ref`-inlined
/// document. Malformed pieces are reported as diagnostics and skipped so the
/// rest of the document still contributes entries.
pub(crate) fn extract_operations(
    namespace: &str,
    name_prefix: &str,
    doc_name: &str,
    doc: &Value,
) -> DocumentOutcome {
    let mut out = DocumentOutcome {
        entries: Vec::new(),
        diagnostics: Vec::new(),
    };

    let Some(paths) = doc.get("paths").and_then(|v| v.as_object()) else {
        out.diagnostics
            .push(format!("{doc_name}: document has no paths object"));
        return out;
    };

    for (path, item) in paths {
        let Some(item_obj) = item.as_object() else {
            out.diagnostics
                .push(format!("{doc_name}: path item '{path}' is not an object"));
            continue;
        };

        let item_params = item_obj
            .get("parameters")
            .map(|p| extract_parameters(doc_name, path, p, &mut out.diagnostics))
            .unwrap_or_default();

        for method in METHOD_KEYS {
            let Some(op) = item_obj.get(*method) else {
                continue;
            };
            let Some(op_obj) = op.as_object() else {
                continue;
            };

            let mut params = item_params.clone();
            if let Some(p) = op_obj.get("parameters") {
                params.extend(extract_parameters(doc_name, path, p, &mut out.diagnostics));
            }
            let params = dedupe_params(params);

            // Every path placeholder must have a matching descriptor; an
            // operation violating that is skipped, not patched up.
            if let Some(missing) = first_unmatched_placeholder(path, &params) {
                out.diagnostics.push(format!(
                    "{doc_name}: {method} {path}: path placeholder '{{{missing}}}' has no parameter descriptor, skipping operation"
                ));
                continue;
            }

            let ident = op_obj
                .get("operationId")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| synthesize_ident(method, path));

            let summary = op_obj
                .get("summary")
                .or_else(|| op_obj.get("description"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let request_body = op_obj.get("requestBody").and_then(body_schema).map(|s| shape_of(s));
            let pagination_param =
                detect_pagination_param(&params).map(|p| p.name.clone());

            out.entries.push(OperationEntry {
                name: operation_name(name_prefix, namespace, &ident),
                method: method.to_uppercase(),
                path: path.clone(),
                parameters: params,
                request_body,
                pagination_param,
                summary,
                namespace: namespace.to_string(),
                base_path: base_path_segments(doc, item, op),
            });
        }
    }

    out
}

fn extract_parameters(
    doc_name: &str,
    path: &str,
    parameters: &Value,
    diagnostics: &mut Vec<String>,
) -> Vec<ParameterDescriptor> {
    let mut out = Vec::new();
    let Some(arr) = parameters.as_array() else {
        diagnostics.push(format!("{doc_name}: {path}: parameters is not an array"));
        return out;
    };
    for p in arr {
        match extract_parameter(p) {
            Some(descriptor) => out.push(descriptor),
            None => diagnostics.push(format!(
                "{doc_name}: {path}: skipping malformed or unsupported parameter"
            )),
        }
    }
    out
}

fn extract_parameter(p: &Value) -> Option<ParameterDescriptor> {
    let name = p.get("name").and_then(|v| v.as_str())?;
    let location = p
        .get("in")
        .and_then(|v| v.as_str())
        .and_then(location_from_str)?;
    let mut required = p.get("required").and_then(|v| v.as_bool()).unwrap_or(false);
    if location == ParameterLocation::Path {
        required = true;
    }
    let schema_value = p.get("schema").cloned().unwrap_or(Value::Null);
    let default = schema_value.get("default").cloned();
    Some(ParameterDescriptor {
        name: name.to_string(),
        location,
        required,
        schema: shape_of(&schema_value),
        default,
    })
}

fn first_unmatched_placeholder<'a>(
    path: &'a str,
    params: &[ParameterDescriptor],
) -> Option<&'a str> {
    placeholders(path).find(|name| {
        !params
            .iter()
            .any(|p| p.location == ParameterLocation::Path && p.name == *name)
    })
}

pub(crate) fn placeholders(path: &str) -> impl Iterator<Item = &str> {
    path.split('{')
        .skip(1)
        .filter_map(|rest| rest.split('}').next())
        .filter(|s| !s.is_empty())
}

fn body_schema(request_body: &Value) -> Option<&Value> {
    let content = request_body.get("content")?.as_object()?;
    if let Some(json_content) = content.get("application/json") {
        return json_content.get("schema");
    }
    // Fall back to the lexically-first content type.
    content.values().next()?.get("schema")
}

/// Base-path segments from `servers`, preferring operation-level over
/// path-item-level over document-level entries.
fn base_path_segments(doc: &Value, item: &Value, op: &Value) -> Vec<String> {
    for scope in [op, item, doc] {
        if let Some(url) = first_server_url(scope) {
            return path_segments_of(&url);
        }
    }
    Vec::new()
}

fn first_server_url(v: &Value) -> Option<String> {
    v.get("servers")?
        .as_array()?
        .first()?
        .get("url")?
        .as_str()
        .map(|s| s.to_string())
}

fn path_segments_of(server_url: &str) -> Vec<String> {
    // Absolute server URLs contribute only their path part.
    let path = match server_url.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or(""),
        None => server_url,
    };
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
