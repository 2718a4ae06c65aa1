//! Release target listing command

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;

pub async fn list_units(config: &Config) -> Result<()> {
    let units = config
        .client()
        .list_units()
        .await
        .context("Failed to list units")?;

    if units.is_empty() {
        println!("No units registered");
        return Ok(());
    }

    for unit in &units {
        let version = match &unit.code_version {
            Some(version) => version.to_string().green(),
            None => "never deployed".dimmed(),
        };

        println!("{} {} ({})", "▸".cyan(), unit.name.bold(), unit.role);
        println!("    Code:     {}", version);
        println!("    Handler:  {}", unit.handler);
        println!(
            "    Profile:  {} MB, {}s, {:?}",
            unit.profile.memory_mb, unit.profile.timeout_secs, unit.profile.network
        );
    }

    Ok(())
}
