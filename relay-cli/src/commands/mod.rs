//! Commands module
//!
//! Defines all CLI commands and routes them to their handlers.

mod grants;
mod run;
mod status;
mod trigger;
mod units;

pub use run::RunCommands;
pub use trigger::TriggerArgs;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Queue a release of one commit
    Trigger(TriggerArgs),
    /// Inspect release runs
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// List provisioned grants
    Grants {
        /// Only show grants of this principal (e.g. code-deployer:migration)
        #[arg(long)]
        principal: Option<String>,
    },
    /// List release target units
    Units,
    /// Check that the orchestrator is reachable
    Health,
}

pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Trigger(args) => trigger::handle_trigger(args, config).await,
        Commands::Run { command } => run::handle_run_command(command, config).await,
        Commands::Grants { principal } => grants::list_grants(config, principal.as_deref()).await,
        Commands::Units => units::list_units(config).await,
        Commands::Health => {
            config
                .client()
                .health()
                .await
                .with_context(|| format!("Orchestrator at {} is unreachable", config.orchestrator_url))?;
            println!("{} {}", "✓".green(), config.orchestrator_url);
            Ok(())
        }
    }
}
