//! Consolidator - Episodic to Semantic Memory Consolidation
//!
//! Command-line entry point: one-off consolidation runs, the periodic
//! scheduler, and configuration inspection.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use consolidator::{
    config::ConsolidatorConfig,
    gateway::HttpMemoryGateway,
    ConsolidationEngine, ConsolidationScheduler, Framework, MemoryStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "consolidator")]
#[command(version)]
#[command(about = "Episodic to semantic memory consolidation")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONSOLIDATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single consolidation
    Consolidate {
        /// Agent framework to consolidate
        #[arg(short, long, default_value = "universal")]
        framework: Framework,

        /// Episodic window in hours (defaults to the schedule window)
        #[arg(short, long)]
        window_hours: Option<u64>,

        /// Load the episodic batch from a JSON file instead of the memory API
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Run even if another consolidation for the framework is in flight
        #[arg(long)]
        force: bool,
    },

    /// Run the consolidation scheduler until interrupted
    Schedule,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("consolidator={}", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = ConsolidatorConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Consolidate {
            framework,
            window_hours,
            input,
            force,
        } => {
            let window = window_hours
                .map(|h| Duration::from_secs(h.saturating_mul(3600)))
                .unwrap_or_else(|| config.schedule.window());
            run_consolidate(config, framework, window, input, force).await?;
        }
        Commands::Schedule => {
            run_schedule(config).await?;
        }
        Commands::Config { default } => {
            let shown = if default {
                ConsolidatorConfig::default()
            } else {
                config
            };
            print!("{}", shown.to_toml()?);
        }
    }

    Ok(())
}

fn build_engine(
    config: &ConsolidatorConfig,
    store: Option<Arc<MemoryStore>>,
) -> Result<ConsolidationEngine> {
    let engine = match store {
        Some(store) => ConsolidationEngine::new(store.clone(), store),
        None => {
            let gateway = Arc::new(HttpMemoryGateway::from_config(&config.gateway)?);
            ConsolidationEngine::new(gateway.clone(), gateway)
        }
    };
    Ok(engine.with_config(config))
}

async fn run_consolidate(
    config: ConsolidatorConfig,
    framework: Framework,
    window: Duration,
    input: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let store = match input {
        Some(path) => {
            let store = MemoryStore::load_json(&path).await.with_context(|| {
                format!("Failed to load episodic batch from {}", path.display())
            })?;
            tracing::info!(
                path = %path.display(),
                entries = store.len().await,
                "Loaded offline batch"
            );
            Some(Arc::new(store))
        }
        None => None,
    };

    let engine = build_engine(&config, store)?;
    let result = engine.consolidate_with(framework, window, force).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_schedule(config: ConsolidatorConfig) -> Result<()> {
    if !config.schedule.enabled {
        tracing::warn!("schedule.enabled is false; running the scheduler anyway");
    }

    let engine = Arc::new(build_engine(&config, None)?);
    let scheduler = ConsolidationScheduler::new(engine, config.schedule.clone());
    scheduler.start().await?;

    tracing::info!("Consolidation scheduler is running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    scheduler.stop().await;

    Ok(())
}
