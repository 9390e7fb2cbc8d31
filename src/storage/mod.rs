//! Object storage module
//!
//! Resolves bucket URLs (S3, GCS, Azure, local filesystem, in-memory) into
//! [`ObjectSource`] handles that the lister, reader and table writer share.

mod source;

pub use source::{join_key, object_path, object_path_opt, ObjectSource};
