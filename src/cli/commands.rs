//! CLI commands and argument parsing

use crate::types::DatasetKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Builds a Parquet star schema from JSON catalog and event objects
#[derive(Parser, Debug)]
#[command(name = "star-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the output destination (local path or cloud URL)
    /// Supports: /path, file:///path, s3://bucket/path, gs://bucket/path, az://container/path
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the catalog and event flows
    Run,

    /// Run the catalog flow only (songs, artists)
    Catalog,

    /// Run the event flow only (users, time, songplays); needs committed songs
    Events,

    /// List the source objects of a dataset
    List {
        /// Dataset to list
        #[arg(long, value_enum)]
        dataset: DatasetArg,
    },

    /// Validate the configuration file
    Validate,
}

/// Dataset selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatasetArg {
    /// Catalog objects
    Catalog,
    /// Event objects
    Events,
}

impl From<DatasetArg> for DatasetKind {
    fn from(arg: DatasetArg) -> Self {
        match arg {
            DatasetArg::Catalog => DatasetKind::Catalog,
            DatasetArg::Events => DatasetKind::Events,
        }
    }
}
