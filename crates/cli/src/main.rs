//! ExoScope CLI
//!
//! A command-line tool for checking the prediction service, submitting
//! exoplanet candidates and browsing recent predictions.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{history, predict, status};
use std::path::PathBuf;

/// ExoScope CLI
#[derive(Parser)]
#[command(name = "exo")]
#[command(author, version, about = "CLI for the ExoScope exoplanet prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via EXO_API_URL env var)
    #[arg(long, env = "EXO_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service status, loaded models and their metrics
    Health,

    /// Show model feature lists, metrics and feature importance
    Metadata {
        /// Number of top features to list per model
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Classify a candidate as CONFIRMED or FALSE POSITIVE
    Classify(PredictArgs),

    /// Estimate a candidate's planet radius in Earth radii
    Regress(PredictArgs),

    /// Show recent predictions, newest first
    History {
        /// Only show predictions for this task
        #[arg(long, value_enum)]
        task: Option<history::TaskFilter>,
    },
}

#[derive(Args)]
pub struct PredictArgs {
    /// Start from a built-in sample candidate
    #[arg(long, value_enum)]
    pub sample: Option<predict::Sample>,

    /// JSON file with feature values, applied over the sample
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Override one feature (key=value, `null` clears it); repeatable
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let format = output::OutputFormat::resolve(cli.format, config.default_format.as_deref());
    let client = client::ApiClient::new(&config.api_url(cli.api_url))?;

    match cli.command {
        Commands::Health => status::show_health(&client, format).await?,
        Commands::Metadata { top } => status::show_metadata(&client, top, format).await?,
        Commands::Classify(args) => {
            let inputs = predict::build_inputs(
                predict::Target::Classifier,
                args.sample,
                args.file.as_deref(),
                &args.set,
            )?;
            predict::classify(&client, &inputs, format).await?;
        }
        Commands::Regress(args) => {
            let inputs = predict::build_inputs(
                predict::Target::Regressor,
                args.sample,
                args.file.as_deref(),
                &args.set,
            )?;
            predict::regress(&client, &inputs, format).await?;
        }
        Commands::History { task } => history::show_history(&client, task, format).await?,
    }

    Ok(())
}
