//! Relay CLI
//!
//! Command-line interface for queuing releases and inspecting runs on the
//! Relay orchestrator.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay release train CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(
        long,
        env = "RELAY_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::new(cli.orchestrator_url);

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_trigger_command() {
        let cli = Cli::try_parse_from([
            "relay",
            "--orchestrator-url",
            "http://relay:9000",
            "trigger",
            "--owner",
            "acme",
            "--repo",
            "shop",
            "--commit",
            "abc123",
        ])
        .unwrap();

        assert_eq!(cli.orchestrator_url, "http://relay:9000");
        match cli.command {
            Commands::Trigger(args) => {
                assert_eq!(args.owner, "acme");
                assert_eq!(args.branch, "main");
                assert_eq!(args.commit, "abc123");
            }
            _ => panic!("expected trigger command"),
        }
    }
}
