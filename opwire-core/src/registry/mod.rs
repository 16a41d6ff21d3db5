mod entry;
mod extract;
pub mod naming;
pub mod pagination;

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

pub use entry::{OperationEntry, ParameterDescriptor, ParameterLocation};

use crate::error::LoadError;
use crate::parser::{parse_document_str, DocumentFormat};
use crate::registry::naming::sanitize_component;
use crate::schema::inline_refs;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Leading component of every generated operation name.
    pub name_prefix: String,
    /// Search result cap applied when the caller does not supply one.
    pub default_search_limit: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name_prefix: "op".to_string(),
            default_search_limit: 50,
        }
    }
}

/// Search filters compose with logical AND; unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub namespace: Option<String>,
    /// HTTP method, matched case-insensitively.
    pub method: Option<String>,
    /// Case-insensitive substring over name, summary, and path.
    pub text: Option<String>,
    pub paginatable: Option<bool>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub operations: usize,
    pub namespaces: usize,
    pub paginatable: usize,
    pub documents_loaded: usize,
    pub documents_skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub documents_loaded: usize,
    pub documents_skipped: usize,
    pub operations: usize,
    pub diagnostics: Vec<String>,
}

/// Indexed, immutable view over every operation described by a source
/// directory. One grouping (namespace) per subdirectory.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    config: RegistryConfig,
    entries: Vec<OperationEntry>,
    by_name: HashMap<String, usize>,
    documents_loaded: usize,
    documents_skipped: usize,
}

impl OperationRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Load every schema document under `source_dir`, replacing any prior
    /// state. Traversal order is sorted, so the same source always produces
    /// the same entries and names. A malformed document is logged and
    /// skipped; an unreadable source directory is fatal.
    pub fn load(&mut self, source_dir: &Path) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::default();
        let mut entries = Vec::<OperationEntry>::new();
        let mut by_name = HashMap::<String, usize>::new();

        for (namespace, dir) in namespace_dirs(source_dir)? {
            let docs = match read_namespace_documents(&dir, &mut report) {
                Ok(docs) => docs,
                Err(e) => {
                    // A grouping that vanished mid-walk is treated like its
                    // documents were malformed, not as a fatal source error.
                    warn!(namespace = %namespace, error = %e, "skipping unreadable namespace");
                    continue;
                }
            };

            for doc_name in docs.keys().cloned().collect::<Vec<_>>() {
                let (inlined, ref_diags) = inline_refs(&docs, &doc_name);
                for d in &ref_diags {
                    debug!(namespace = %namespace, document = %doc_name, "{d}");
                }
                report.diagnostics.extend(ref_diags);

                let outcome = extract::extract_operations(
                    &namespace,
                    &self.config.name_prefix,
                    &doc_name,
                    &inlined,
                );
                for d in &outcome.diagnostics {
                    warn!(namespace = %namespace, document = %doc_name, "{d}");
                }
                report.diagnostics.extend(outcome.diagnostics);

                for mut entry in outcome.entries {
                    entry.name = unique_name(&by_name, entry.name);
                    by_name.insert(entry.name.clone(), entries.len());
                    entries.push(entry);
                }
            }
        }

        report.operations = entries.len();
        self.entries = entries;
        self.by_name = by_name;
        self.documents_loaded = report.documents_loaded;
        self.documents_skipped = report.documents_skipped;
        Ok(report)
    }

    pub fn get(&self, name: &str) -> Option<&OperationEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn search(&self, filters: &SearchFilters) -> Vec<&OperationEntry> {
        let limit = filters.limit.unwrap_or(self.config.default_search_limit);
        let text = filters.text.as_ref().map(|t| t.to_ascii_lowercase());
        self.entries
            .iter()
            .filter(|e| {
                filters
                    .namespace
                    .as_ref()
                    .map(|ns| e.namespace == *ns)
                    .unwrap_or(true)
            })
            .filter(|e| {
                filters
                    .method
                    .as_ref()
                    .map(|m| e.method.eq_ignore_ascii_case(m))
                    .unwrap_or(true)
            })
            .filter(|e| {
                filters
                    .paginatable
                    .map(|p| e.paginatable() == p)
                    .unwrap_or(true)
            })
            .filter(|e| {
                text.as_ref()
                    .map(|t| {
                        e.name.to_ascii_lowercase().contains(t)
                            || e.summary.to_ascii_lowercase().contains(t)
                            || e.path.to_ascii_lowercase().contains(t)
                    })
                    .unwrap_or(true)
            })
            .take(limit)
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let mut namespaces = self
            .entries
            .iter()
            .map(|e| e.namespace.as_str())
            .collect::<Vec<_>>();
        namespaces.sort_unstable();
        namespaces.dedup();
        RegistryStats {
            operations: self.entries.len(),
            namespaces: namespaces.len(),
            paginatable: self.entries.iter().filter(|e| e.paginatable()).count(),
            documents_loaded: self.documents_loaded,
            documents_skipped: self.documents_skipped,
        }
    }

    pub fn entries(&self) -> &[OperationEntry] {
        &self.entries
    }
}

/// Collisions get a deterministic numeric suffix; traversal order is sorted,
/// so the suffix assignment is stable across reloads of the same source.
fn unique_name(taken: &HashMap<String, usize>, name: String) -> String {
    if !taken.contains_key(&name) {
        return name;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{name}_{n}");
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn namespace_dirs(source_dir: &Path) -> Result<Vec<(String, std::path::PathBuf)>, LoadError> {
    let read = std::fs::read_dir(source_dir).map_err(|source| LoadError::SourceUnreadable {
        path: source_dir.to_path_buf(),
        source,
    })?;
    let mut dirs = Vec::new();
    for entry in read.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            dirs.push((sanitize_component(name), path));
        } else {
            debug!(path = %path.display(), "ignoring file outside a namespace grouping");
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn read_namespace_documents(
    dir: &Path,
    report: &mut LoadReport,
) -> std::io::Result<std::collections::BTreeMap<String, Value>> {
    let mut docs = std::collections::BTreeMap::new();
    let mut files = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("json") | Some("yaml") | Some("yml")
                )
        })
        .collect::<Vec<_>>();
    files.sort();

    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable document");
                report.documents_skipped += 1;
                continue;
            }
        };
        match parse_document_str(&text, DocumentFormat::Auto) {
            Ok(value) => {
                report.documents_loaded += 1;
                docs.insert(stem, value);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed document");
                report.documents_skipped += 1;
            }
        }
    }
    Ok(docs)
}
