//! Classify command - shows the relevance filter's verdict for a message.

use anyhow::Result;
use clap::Args;
use console::style;
use keel_capture::{Relevance, RelevanceFilter};
use serde::Serialize;

use super::Context;

/// Arguments for the classify command.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Message text to classify
    pub text: String,
}

#[derive(Debug, Serialize)]
struct ClassifyOutput<'a> {
    text: &'a str,
    consult: bool,
    reason: Option<String>,
}

/// Run the classify command.
pub fn run(args: ClassifyArgs, ctx: &Context) -> Result<()> {
    let verdict = RelevanceFilter::global().classify(&args.text);
    let reason = match verdict {
        Relevance::Consider => None,
        Relevance::Skip(reason) => Some(reason.to_string()),
    };

    if ctx.json_output {
        let output = ClassifyOutput {
            text: &args.text,
            consult: verdict.should_consult(),
            reason,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    match reason {
        None => println!("{}", style("consider").green()),
        Some(reason) => println!("{} ({})", style("skip").yellow(), reason),
    }
    Ok(())
}
