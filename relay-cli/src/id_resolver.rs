//! Resolution of run id prefixes to full UUIDs

use anyhow::{Context, Result, anyhow};
use relay_client::OrchestratorClient;
use relay_core::dto::run::RunSummary;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a run id or prefix to a full UUID
///
/// A full UUID is returned as-is; a prefix is matched against the run list.
pub async fn resolve_run_id(client: &OrchestratorClient, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let runs = client
        .list_runs()
        .await
        .context("Failed to fetch runs for ID resolution")?;

    select_run(&runs, id_or_prefix)
}

fn select_run(runs: &[RunSummary], id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    let matches: Vec<Uuid> = runs
        .iter()
        .map(|r| r.id)
        .filter(|id| id_or_prefix.matches(id))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No run found with ID starting with '{}'", id_or_prefix)),
        [id] => Ok(*id),
        ids => {
            let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple runs: {}",
                id_or_prefix,
                ids.join(", ")
            ))
        }
    }
}
