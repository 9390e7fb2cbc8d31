//! Object listing module
//!
//! # Overview
//!
//! Enumerates object keys under a prefix one page at a time, following the
//! store's continuation token until it reports no more pages. Keys are
//! filtered by suffix as each page arrives, so a listing larger than memory
//! never has to be materialized.

mod lister;
mod store;
mod types;

pub use lister::{has_suffix, ObjectLister};
pub use types::{ListPage, ListingSource, ObjectLocator};
