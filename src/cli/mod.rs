//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! # Commands
//!
//! - `run` - Run both flows
//! - `catalog` - Run the catalog flow
//! - `events` - Run the event flow
//! - `list` - List source objects
//! - `validate` - Validate the config file

mod commands;
mod runner;

pub use commands::{Cli, Commands, DatasetArg};
pub use runner::Runner;
