#![forbid(unsafe_code)]

//! API description parsing, reference resolution, and the operation registry.
//!
//! This crate turns a directory of schema documents into an indexed set of
//! [`OperationEntry`] values; executing them lives in `opwire-exec`.

pub mod error;
pub mod parser;
pub mod registry;
pub mod schema;

pub use crate::error::{LoadError, ParseError};
pub use crate::parser::{parse_document_str, DocumentFormat};
pub use crate::registry::{
    LoadReport, OperationEntry, OperationRegistry, ParameterDescriptor, ParameterLocation,
    RegistryConfig, RegistryStats, SearchFilters,
};
pub use crate::schema::SchemaShape;
