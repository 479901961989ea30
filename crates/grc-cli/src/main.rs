//! GRC risk CLI
//!
//! Command-line front end for the risk scoring engine. Each command reads a
//! tenant register snapshot (JSON) and prints one part of the report.
//!
//! # Usage
//!
//! ```bash
//! grc summary register.json --department finance
//! grc heatmap register.json --residual
//! grc top register.json --limit 5 --format json
//! grc batch tenants/*.json
//! grc matrix validate matrix.json
//! ```

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use grc_risk::RiskEngine;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::Session;

#[derive(Parser)]
#[command(name = "grc")]
#[command(version)]
#[command(about = "Risk scoring and heat-map reporting", long_about = None)]
struct Cli {
    /// Output format (defaults to the configured format, then table)
    #[arg(long, short, global = true)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short, global = true)]
    profile: Option<String>,

    /// Explicit config file path
    #[arg(long, env = "GRC_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    #[command(flatten)]
    Engine(EngineCommands),
}

/// Commands that run against a configured engine
#[derive(Subcommand)]
enum EngineCommands {
    /// Residual risk per risk
    Residual { input: String },
    /// Inherent or residual heat map
    Heatmap {
        input: String,
        #[arg(long)]
        residual: bool,
    },
    /// Portfolio summary
    Summary {
        input: String,
        #[arg(long)]
        department: Option<String>,
        /// Report date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Highest exposure open risks
    Top {
        input: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Monthly score trends
    Trends {
        input: String,
        #[arg(long)]
        months: Option<u32>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Risks needing treatment, most urgent first
    Priorities {
        input: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Evaluate several tenant registers
    Batch {
        #[arg(required = true)]
        inputs: Vec<String>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Inspect risk matrices
    Matrix {
        #[command(subcommand)]
        action: MatrixCommands,
    },
}

#[derive(Subcommand)]
pub enum MatrixCommands {
    /// Validate a matrix definition file (JSON or YAML)
    Validate { input: String },
    /// Show the standard 5x5 matrix
    Default,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::Config::default_path(cli.profile.as_deref())?,
    };
    match cli.command {
        Commands::Config { action } => commands::config::handle(action, &config_path),
        Commands::Engine(command) => execute(command, &config_path, cli.format).await,
    }
}

async fn execute(command: EngineCommands, config_path: &PathBuf, flag: Option<output::OutputFormat>) -> Result<()> {
    let config = config::Config::load(config_path)?;
    let format = output::OutputFormat::resolve(flag, config.default_format.as_deref());
    let engine = RiskEngine::new(config.engine)?;
    tracing::debug!(config = %config_path.display(), ?format, "grc starting");

    let session = Session::new(engine, format);
    match command {
        EngineCommands::Residual { input } => commands::report::residual(&session, &input),
        EngineCommands::Heatmap { input, residual } => commands::report::heatmap(&session, &input, residual),
        EngineCommands::Summary { input, department, as_of } => {
            commands::report::summary(&session, &input, department.as_deref(), as_of)
        }
        EngineCommands::Top { input, limit } => commands::report::top(&session, &input, limit),
        EngineCommands::Trends { input, months, as_of } => {
            commands::report::trends(&session, &input, months, as_of)
        }
        EngineCommands::Priorities { input, limit } => commands::report::priorities(&session, &input, limit),
        EngineCommands::Batch { inputs, as_of } => {
            let as_of = as_of.unwrap_or_else(commands::today);
            commands::batch::handle(session.engine, inputs, as_of, format).await
        }
        EngineCommands::Matrix { action } => commands::matrix::handle(action, format),
    }
}
