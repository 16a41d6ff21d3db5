mod refs;
mod shape;

pub use refs::{inline_refs, RefError, SELF_REFERENCE_KEY};
pub use shape::{shape_of, SchemaShape};
