//! Release trigger command

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use relay_core::domain::source::Trigger;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct TriggerArgs {
    /// Repository owner
    #[arg(long)]
    pub owner: String,
    /// Repository name
    #[arg(long)]
    pub repo: String,
    /// Branch the commit belongs to
    #[arg(long, default_value = "main")]
    pub branch: String,
    /// Commit to release
    #[arg(long)]
    pub commit: String,
}

impl From<TriggerArgs> for Trigger {
    fn from(args: TriggerArgs) -> Self {
        Trigger::new(args.owner, args.repo, args.branch, args.commit)
    }
}

pub async fn handle_trigger(args: TriggerArgs, config: &Config) -> Result<()> {
    let trigger: Trigger = args.into();
    println!("{} Queuing release of {}", "▸".cyan(), trigger);

    let accepted = config
        .client()
        .trigger_release(&trigger)
        .await
        .context("Failed to queue release")?;

    println!("{} Run {} queued", "✓".green(), accepted.run_id.to_string().cyan());
    match accepted.runs_ahead {
        0 => println!("  Next in the release lane"),
        n => println!("  {} run(s) ahead in the release lane", n),
    }
    println!(
        "  Follow with: {}",
        format!("relay run watch {}", accepted.run_id).dimmed()
    );

    Ok(())
}
