use std::path::PathBuf;

use thiserror::Error;

/// Fatal load failures. Per-document problems are logged and skipped instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source directory is not readable: {}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("document root must be an object")]
    NotAnObject,
}
