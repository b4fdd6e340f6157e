//! Keel - conversation memory capture and recall bridge
//!
//! Main entry point for the Keel CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

mod bridge;
mod commands;

use commands::{classify, health, run};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Keel - conversation memory capture and recall bridge
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User config directory (default: $KEEL_CONFIG_DIR or the platform config dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub config: Option<PathBuf>,

    /// Memory service URL, overriding config and KEEL_API_URL
    #[arg(long, global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve host hook events as JSON lines on stdin/stdout
    Run(run::RunArgs),

    /// Show whether a message would trigger a memory lookup
    Classify(classify::ClassifyArgs),

    /// Check that the memory service is reachable
    Health(health::HealthArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli.config.clone().or_else(keel_config::user_config_dir);
    let loaded = keel_config::load_config_with_options(None, cli.config.as_deref())
        .context("failed to load configuration")?;

    let _guard = init_tracing(cli.verbose, &loaded.config, config_dir.as_deref());
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    let ctx = commands::Context {
        config: loaded.config,
        server_override: cli.server,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Classify(args) => classify::run(args, &ctx),
        Commands::Health(args) => health::run(args, &ctx).await,
    }
}

/// Console (human-readable, stderr) plus an optional daily JSON file.
///
/// Stdout is reserved for the hook bridge protocol.
fn init_tracing(
    verbose: bool,
    config: &keel_config::KeelConfig,
    config_dir: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "keel=debug,keel_capture=debug,keel_client=debug,keel_config=debug,info"
    } else {
        "keel=info,keel_capture=info,keel_client=info,warn"
    };

    let logging = config.logging();
    let (file_layer, guard) = if logging.json_file {
        let log_dir = logging
            .directory
            .or_else(|| config_dir.map(|d| d.join("logs")))
            .unwrap_or_else(|| PathBuf::from("logs"));
        let file_appender = tracing_appender::rolling::daily(&log_dir, "keel.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(
                "keel=trace,keel_capture=trace,keel_client=trace,keel_config=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    guard
}
