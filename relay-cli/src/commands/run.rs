//! Run inspection commands

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use relay_client::OrchestratorClient;
use relay_core::domain::run::{PipelineRun, RunStatus, StageOutput, StageRun};
use relay_core::domain::unit::Ack;
use relay_core::dto::run::RunSummary;
use std::time::Duration;
use uuid::Uuid;

use super::status::{colorize_run_status, colorize_stage_status, print_log_entry};
use crate::config::Config;
use crate::id_resolver::resolve_run_id;
use crate::types::IdOrPrefix;

#[derive(Subcommand)]
pub enum RunCommands {
    /// List runs, newest first
    List {
        /// Only show runs with this status (Queued, Running, Succeeded, Failed)
        #[arg(long)]
        status: Option<RunStatus>,
        /// Show at most this many runs
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one run with its stage records
    Get {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// Show the logs captured by each stage of a run
    Logs {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// Follow a run until it finishes
    Watch {
        /// Run ID or unambiguous prefix
        id: String,
        /// Polling interval in seconds
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
}

pub async fn handle_run_command(command: RunCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        RunCommands::List { status, limit } => list_runs(&client, status, limit).await,
        RunCommands::Get { id } => {
            let id = resolve_run_id(&client, &IdOrPrefix::parse(&id)).await?;
            let run = fetch_run(&client, id).await?;
            print_run_details(&run);
            Ok(())
        }
        RunCommands::Logs { id } => {
            let id = resolve_run_id(&client, &IdOrPrefix::parse(&id)).await?;
            print_run_logs(&client, id).await
        }
        RunCommands::Watch { id, interval } => {
            let id = resolve_run_id(&client, &IdOrPrefix::parse(&id)).await?;
            watch_run(&client, id, Duration::from_secs(interval.max(1))).await
        }
    }
}

async fn fetch_run(client: &OrchestratorClient, id: Uuid) -> Result<PipelineRun> {
    client
        .get_run(id)
        .await
        .with_context(|| format!("Failed to get run {}", id))
}

async fn list_runs(
    client: &OrchestratorClient,
    status: Option<RunStatus>,
    limit: usize,
) -> Result<()> {
    let runs = client.list_runs().await.context("Failed to list runs")?;

    let runs: Vec<RunSummary> = runs
        .into_iter()
        .filter(|r| status.is_none_or(|s| r.status == s))
        .take(limit)
        .collect();

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!("{}", "Runs:".bold());
    println!("{}", "─".repeat(80).dimmed());
    for run in &runs {
        print_run_summary(run);
    }

    Ok(())
}

fn print_run_summary(run: &RunSummary) {
    println!(
        "{} {} {}",
        "▸".cyan(),
        run.id.to_string().cyan(),
        colorize_run_status(run.status)
    );
    println!("    Commit:   {} ({})", run.commit_ref, run.branch);
    println!(
        "    Created:  {}",
        run.requested_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(version) = &run.live_version {
        println!("    Live:     {}", version.to_string().green());
    }
    if let Some(stage) = run.failed_stage {
        println!("    Failed:   {}", stage.to_string().red());
    }
    println!();
}

fn print_run_details(run: &PipelineRun) {
    println!("{}", "Run Details:".bold());
    println!("  ID:          {}", run.id.to_string().cyan());
    println!("  Source:      {}", run.trigger);
    println!("  Status:      {}", colorize_run_status(run.status));
    println!(
        "  Requested:   {}",
        run.requested_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(started) = run.started_at {
        println!("  Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(completed) = run.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));
        if let Some(started) = run.started_at {
            let duration = completed.signed_duration_since(started);
            println!("  Duration:    {}s", duration.num_seconds());
        }
    }
    if let Some(artifact) = &run.artifact {
        println!(
            "  Artifact:    {} ({} bytes, sha256 {})",
            artifact.reference(),
            artifact.size_bytes,
            artifact.digest.dimmed()
        );
    }
    if let Some(version) = &run.live_version {
        println!("  Live:        {}", version.to_string().green());
    }

    println!("\n{}", "Stages:".bold());
    for stage in &run.stages {
        print_stage(stage);
    }

    if let Some(failure) = &run.failure {
        println!("\n{}", "Failure:".bold());
        println!("{}", failure.to_string().red());
    }
}

fn print_stage(stage: &StageRun) {
    println!(
        "  {:<24} {}",
        stage.stage.to_string(),
        colorize_stage_status(stage.status)
    );

    match &stage.output {
        Some(StageOutput::Snapshot(snapshot)) => {
            println!("      commit {}", snapshot.commit_ref.dimmed());
        }
        Some(StageOutput::Artifact(artifact)) => {
            println!("      built {}", artifact.reference().to_string().dimmed());
        }
        Some(StageOutput::Invocation(result)) => {
            println!(
                "      status {} {}",
                result.status_code,
                serde_json::to_string(&result.payload)
                    .unwrap_or_default()
                    .dimmed()
            );
        }
        Some(StageOutput::CodeUpdated { unit, version, ack }) => {
            let ack = match ack {
                Ack::Updated { .. } => "updated",
                Ack::Unchanged => "unchanged",
            };
            println!("      {} -> {} ({})", unit, version, ack.dimmed());
        }
        None => {}
    }
}

async fn print_run_logs(client: &OrchestratorClient, id: Uuid) -> Result<()> {
    let stages = client
        .get_run_logs(id)
        .await
        .with_context(|| format!("Failed to get logs for run {}", id))?;

    for stage in stages.iter().filter(|s| !s.entries.is_empty()) {
        println!(
            "{} {} {}",
            "▸".cyan(),
            stage.stage.to_string().bold(),
            colorize_stage_status(stage.status)
        );
        for entry in &stage.entries {
            print_log_entry(entry);
        }
    }

    Ok(())
}

async fn watch_run(client: &OrchestratorClient, id: Uuid, interval: Duration) -> Result<()> {
    println!("{} Watching run {}", "▸".cyan(), id.to_string().cyan());

    let mut last: Option<(RunStatus, Vec<_>)> = None;
    loop {
        let run = fetch_run(client, id).await?;
        let snapshot = (
            run.status,
            run.stages.iter().map(|s| s.status).collect::<Vec<_>>(),
        );

        if last.as_ref() != Some(&snapshot) {
            let current = run
                .stages
                .iter()
                .find(|s| !s.status.is_terminal() && s.started_at.is_some())
                .map(|s| s.stage.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {} {}  stage: {}",
                chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
                colorize_run_status(run.status),
                current
            );
            last = Some(snapshot);
        }

        if run.is_terminal() {
            println!();
            print_run_details(&run);
            if run.status == RunStatus::Failed {
                anyhow::bail!("Run {} failed", id);
            }
            return Ok(());
        }

        tokio::time::sleep(interval).await;
    }
}
