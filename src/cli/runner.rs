//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::{load_config, PipelineConfig};
use crate::error::{Error, Result};
use crate::pipeline::{FlowStats, Pipeline};
use crate::types::DatasetKind;
use serde_json::{json, Value};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run => {
                let summary = self.pipeline()?.run().await?;
                self.report_flow(&summary.catalog);
                self.report_flow(&summary.events);
                Ok(())
            }
            Commands::Catalog => {
                let stats = self.pipeline()?.run_catalog_flow().await?;
                self.report_flow(&stats);
                Ok(())
            }
            Commands::Events => {
                let stats = self.pipeline()?.run_event_flow().await?;
                self.report_flow(&stats);
                Ok(())
            }
            Commands::List { dataset } => self.list((*dataset).into()).await,
            Commands::Validate => self.validate(),
        }
    }

    /// Load the config file, applying the `--output` override
    fn load_config(&self) -> Result<PipelineConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;

        let mut config = load_config(path)?;
        if let Some(output) = &self.cli.output {
            config.output.url.clone_from(output);
            config.validate()?;
        }

        Ok(config)
    }

    fn pipeline(&self) -> Result<Pipeline> {
        Pipeline::new(self.load_config()?)
    }

    /// List source objects
    async fn list(&self, dataset: DatasetKind) -> Result<()> {
        let locators = self.pipeline()?.list(dataset).await?;

        for locator in &locators {
            self.output_message(&json!({
                "type": "OBJECT",
                "dataset": dataset,
                "url": locator.to_string(),
            }));
        }

        Ok(())
    }

    /// Validate the config file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Config is valid: catalog {}/{}, events {}/{}, output {}",
                    config.catalog.url,
                    config.catalog.prefix,
                    config.events.url,
                    config.events.prefix,
                    config.output.url
                )
            }
        }));

        Ok(())
    }

    /// One line per committed table, then the flow totals
    fn report_flow(&self, stats: &FlowStats) {
        for table in &stats.tables {
            self.output_message(&json!({
                "type": "TABLE",
                "table": table,
            }));
        }

        self.output_message(&json!({
            "type": "FLOW",
            "flow": stats,
        }));
    }

    fn output_message(&self, msg: &Value) {
        println!("{}", serde_json::to_string(msg).unwrap_or_default());
    }
}
