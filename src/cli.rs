use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::charts;
use crate::source::DocumentSource;
use crate::transform;

#[derive(Parser)]
#[command(name = "cidash")]
#[command(author, version, about = "CI build metrics chart derivation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Metrics document location: a local file path or an http(s) URL
    #[arg(
        short,
        long,
        global = true,
        env = "CIDASH_INPUT",
        default_value = "github_action_data.json"
    )]
    input: String,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive every standing dashboard chart
    Charts,

    /// Package duration breakdown for a single workflow run
    Breakdown {
        /// Workflow name (e.g. "build-main")
        #[arg(short, long)]
        workflow: String,

        /// Zero-based run index (defaults to the latest run)
        #[arg(short, long)]
        build_index: Option<usize>,

        /// Packages to keep before folding the rest into "Others"
        #[arg(short, long, default_value_t = 30)]
        top: usize,
    },

    /// Per-package build duration trend across runs
    Package {
        /// Workflow name (e.g. "build-main")
        #[arg(short, long)]
        workflow: String,

        /// Package name to plot
        #[arg(short = 'P', long)]
        package: String,
    },

    /// List every package name seen in a workflow's build details
    Labels {
        /// Workflow name (e.g. "build-main")
        #[arg(short, long)]
        workflow: String,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let source = DocumentSource::parse(&self.input)?;
        let document = source.load().await?;

        let value = match &self.command {
            Commands::Charts => serde_json::to_value(charts::derive_dashboard(&document))?,
            Commands::Breakdown {
                workflow,
                build_index,
                top,
            } => {
                let records = document.workflow(workflow)?;
                let index = build_index.unwrap_or_else(|| records.len().saturating_sub(1));
                serde_json::to_value(charts::package_breakdown(records, index, *top)?)?
            }
            Commands::Package { workflow, package } => {
                let records = document.workflow(workflow)?;
                serde_json::to_value(charts::package_trend(records, package))?
            }
            Commands::Labels { workflow } => {
                let records = document.workflow(workflow)?;
                serde_json::to_value(transform::collect_label_universe(records))?
            }
        };

        let json_output = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Chart data written to: {}", output_path.display());
        } else {
            println!("{}", json_output);
        }

        Ok(())
    }
}
