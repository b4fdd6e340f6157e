//! Run command - serves host hook events until stopped.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use keel_capture::{ConversationBufferRegistry, MemoryHooks};
use keel_config::FeatureFlags;
use tokio::io::BufReader;
use tracing::{info, warn};

use super::Context;
use crate::bridge;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Check the memory service before serving events
    #[arg(long)]
    pub check: bool,
}

/// Wire the hooks from configuration.
pub fn build_hooks(ctx: &Context) -> Result<MemoryHooks> {
    let flags = FeatureFlags::resolve(&ctx.config);
    let client = Arc::new(ctx.client()?);

    let registry = ConversationBufferRegistry::new(ctx.buffer_config(), client.clone())
        .context("invalid [buffer] configuration")?;

    let mut hooks = MemoryHooks::new(registry).with_capture(flags.capture);
    if flags.recall {
        hooks = hooks.with_recall(client, ctx.config.recall().max_tokens);
    }

    info!(
        capture = flags.capture,
        recall = flags.recall,
        "Memory hooks ready"
    );
    Ok(hooks)
}

/// Run the bridge on stdin/stdout.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    if args.check {
        let client = ctx.client()?;
        if !client.health().is_healthy().await {
            warn!(server = %client.base_url(), "Memory service is not reachable, continuing");
        }
    }

    let hooks = build_hooks(ctx)?;

    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let report = bridge::serve(&hooks, input, output, shutdown).await?;
    info!(
        channels = report.outcomes.len(),
        extraction_calls = report.extraction_calls(),
        "Stopped"
    );
    Ok(())
}
