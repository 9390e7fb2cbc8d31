//! Transformation module
//!
//! # Overview
//!
//! Pure, deterministic functions from raw row sets to the star schema:
//!
//! - `songs`, `artists` and `users` are distinct projections of the raw rows
//! - `time` holds calendar fields derived from each distinct event timestamp
//! - `songplays` joins play events to the catalog dimension by exact title
//!
//! Given the same input rows in the same order, every function here returns
//! the same output in the same order.

mod dims;
mod distinct;
mod join;
mod time;

pub use dims::{
    build_catalog_dim, build_creator_dim, build_user_dim, catalog_dim_schema,
    creator_dim_schema, user_dim_schema,
};
pub use distinct::{col, dedup_by_key, distinct_projection, key_collisions, Projection};
pub use join::{
    filter_events, is_play_event, join_events_to_catalog, play_fact_schema, CatalogIndex,
    CatalogMatch, JoinOutcome, PlayIdGenerator,
};
pub use time::{build_time_dim, derive_time_fields, time_dim_schema, TimeFields};
