//! Grant listing command

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use relay_core::domain::grant::Principal;

use crate::config::Config;

pub async fn list_grants(config: &Config, principal: Option<&str>) -> Result<()> {
    if let Some(principal) = principal {
        principal.parse::<Principal>().map_err(|e| anyhow!(e))?;
    }

    let grants = config
        .client()
        .list_grants(principal)
        .await
        .context("Failed to list grants")?;

    if grants.is_empty() {
        println!("No grants found");
        return Ok(());
    }

    let mut current = None;
    for grant in &grants {
        if current != Some(grant.principal) {
            println!("{} {}", "▸".cyan(), grant.principal.to_string().bold());
            current = Some(grant.principal);
        }
        let actions: Vec<&str> = grant.actions.iter().map(|a| a.as_str()).collect();
        println!("    {:<22} {}", grant.resource.to_string(), actions.join(", ").dimmed());
    }

    Ok(())
}
