use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::SchemaShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: SchemaShape,
    /// Constant default from the value schema; auto-injected for headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// One (method, path) pair extracted from a source document. Built once per
/// load pass and immutable afterwards.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OperationEntry {
    /// Unique, reproducible across reloads of the same source.
    pub name: String,
    /// Uppercase HTTP method.
    pub method: String,
    /// Path template with `{param}` placeholders.
    pub path: String,
    /// Ordered path, then query, then header descriptors.
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<SchemaShape>,
    /// Query parameter the pagination cursor merges into, if detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_param: Option<String>,
    pub summary: String,
    pub namespace: String,
    /// Path segments of the server base, prepended to `path` on the wire.
    pub base_path: Vec<String>,
}

impl OperationEntry {
    pub fn paginatable(&self) -> bool {
        self.pagination_param.is_some()
    }

    /// Base-path segments joined with the operation path template.
    pub fn full_path(&self) -> String {
        if self.base_path.is_empty() {
            return self.path.clone();
        }
        format!("/{}{}", self.base_path.join("/"), self.path)
    }

    pub fn parameters_in(
        &self,
        location: ParameterLocation,
    ) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(move |p| p.location == location)
    }
}

pub(crate) fn location_from_str(s: &str) -> Option<ParameterLocation> {
    match s {
        "path" => Some(ParameterLocation::Path),
        "query" => Some(ParameterLocation::Query),
        "header" => Some(ParameterLocation::Header),
        _ => None,
    }
}

/// Merge duplicates by (location, name): required-ness ORs, the first schema
/// wins. Output is ordered path, query, header, then by name.
pub(crate) fn dedupe_params(params: Vec<ParameterDescriptor>) -> Vec<ParameterDescriptor> {
    let mut map: BTreeMap<(u8, String), ParameterDescriptor> = BTreeMap::new();
    for p in params {
        let key = (location_rank(p.location), p.name.clone());
        match map.get_mut(&key) {
            Some(existing) => existing.required |= p.required,
            None => {
                map.insert(key, p);
            }
        }
    }
    map.into_values().collect()
}

fn location_rank(loc: ParameterLocation) -> u8 {
    match loc {
        ParameterLocation::Path => 0,
        ParameterLocation::Query => 1,
        ParameterLocation::Header => 2,
    }
}
