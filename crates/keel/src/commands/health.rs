//! Health command - checks the memory service.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use serde::Serialize;

use super::Context;

/// Arguments for the health command.
#[derive(Args, Debug)]
pub struct HealthArgs {}

#[derive(Debug, Serialize)]
struct HealthOutput {
    healthy: bool,
    status: Option<String>,
    version: Option<String>,
    server_url: String,
}

/// Run the health command.
pub async fn run(_args: HealthArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let server_url = client.base_url().to_string();
    let result = client.health().check().await;

    if ctx.json_output {
        let output = match &result {
            Ok(health) => HealthOutput {
                healthy: health.is_ok(),
                status: Some(health.status.clone()),
                version: health.version.clone(),
                server_url,
            },
            Err(_) => HealthOutput {
                healthy: false,
                status: None,
                version: None,
                server_url,
            },
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let dim = Style::new().dim();
        match &result {
            Ok(health) => {
                let status = if health.is_ok() {
                    Style::new().green().apply_to(format!("● {}", health.status))
                } else {
                    Style::new().yellow().apply_to(format!("● {}", health.status))
                };
                println!("  {} {}", dim.apply_to("Status:"), status);
                if let Some(version) = &health.version {
                    println!("  {} {}", dim.apply_to("Version:"), version);
                }
                println!("  {} {}", dim.apply_to("Server:"), server_url);
            }
            Err(e) => {
                println!(
                    "  {} {}",
                    dim.apply_to("Status:"),
                    Style::new().red().apply_to("● unreachable")
                );
                println!("  {} {}", dim.apply_to("Server:"), server_url);
                println!("  {} {}", dim.apply_to("Error:"), e);
            }
        }
    }

    match result {
        Ok(health) if health.is_ok() => Ok(()),
        Ok(health) => bail!("memory service reports status '{}'", health.status),
        Err(e) => bail!("memory service unreachable: {}", e),
    }
}
