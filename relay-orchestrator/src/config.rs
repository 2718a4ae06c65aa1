//! Orchestrator configuration
//!
//! Everything is read from environment variables with defaults suitable for
//! a local run: in-memory run history, a filesystem artifact store and an
//! in-process compute registry.

use anyhow::{Context, Result};
use relay_engine::{PipelineSettings, ReleaseTargets, Topology};
use std::path::PathBuf;
use std::time::Duration;

/// Repository the release train follows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRepository {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl SourceRepository {
    /// Whether a pushed `owner/repo` names this repository
    pub fn matches(&self, owner: &str, repo: &str) -> bool {
        self.owner.eq_ignore_ascii_case(owner) && self.repo.eq_ignore_ascii_case(repo)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API binds to
    pub bind_addr: String,

    /// Postgres URL; run history stays in memory when unset
    pub database_url: Option<String>,

    pub artifact_dir: PathBuf,
    pub artifact_name: String,

    /// Directory for per-run working trees
    pub workspace_dir: PathBuf,

    pub build_commands: Vec<String>,
    /// Package path relative to the working tree
    pub build_output: String,
    pub build_timeout: Duration,

    /// Remote compute registry; an in-process registry is used when unset
    pub registry_url: Option<String>,

    pub targets: ReleaseTargets,
    pub migration_timeout: Duration,

    /// Period of the cleanup invocation; `None` disables the schedule
    pub cleanup_interval: Option<Duration>,

    pub source: SourceRepository,
    /// Secret for `X-Hub-Signature-256` on webhook deliveries
    pub webhook_secret: Option<String>,
    pub topology: Topology,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - GITHUB_USERNAME, GITHUB_REPOSITORY (required)
    /// - GITHUB_BRANCH (default: main)
    /// - ORCHESTRATOR_BIND_ADDR (default: 0.0.0.0:8080)
    /// - DATABASE_URL (optional)
    /// - ARTIFACT_DIR (default: ./artifacts), ARTIFACT_NAME (default: lambda.zip)
    /// - WORKSPACE_DIR (default: ./workspace)
    /// - BUILD_COMMANDS (`;`-separated), BUILD_OUTPUT, BUILD_TIMEOUT (seconds, default: 900)
    /// - REGISTRY_URL (optional)
    /// - APPLICATION_UNIT, MIGRATION_UNIT, CLEANUP_UNIT
    /// - MIGRATION_TIMEOUT (seconds, default: 120)
    /// - CLEANUP_INTERVAL (seconds, default: 300, 0 disables)
    /// - WEBHOOK_SECRET (optional; enables push signature checks)
    /// - VPC_ATTACHED, NOTIFICATIONS, IDENTITY_POOL, MIGRATION_CALLBACK (default: true)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = ReleaseTargets::default();

        let owner = var("GITHUB_USERNAME").context("GITHUB_USERNAME environment variable not set")?;
        let repo =
            var("GITHUB_REPOSITORY").context("GITHUB_REPOSITORY environment variable not set")?;

        let build_commands = match var("BUILD_COMMANDS") {
            Some(commands) => commands
                .split(';')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect(),
            None => relay_engine::build::ShellBuild::default_commands(),
        };

        let cleanup_secs = seconds(&var, "CLEANUP_INTERVAL", 300)?;

        let artifact_name = var("ARTIFACT_NAME").unwrap_or_else(|| "lambda.zip".to_string());

        Ok(Self {
            bind_addr: var("ORCHESTRATOR_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: var("DATABASE_URL"),
            artifact_dir: var("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./artifacts")),
            build_output: var("BUILD_OUTPUT").unwrap_or_else(|| artifact_name.clone()),
            artifact_name,
            workspace_dir: var("WORKSPACE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./workspace")),
            build_commands,
            build_timeout: Duration::from_secs(seconds(&var, "BUILD_TIMEOUT", 900)?),
            registry_url: var("REGISTRY_URL"),
            targets: ReleaseTargets {
                application: var("APPLICATION_UNIT").unwrap_or(defaults.application),
                migration: var("MIGRATION_UNIT").unwrap_or(defaults.migration),
                cleanup: var("CLEANUP_UNIT").unwrap_or(defaults.cleanup),
            },
            migration_timeout: Duration::from_secs(seconds(&var, "MIGRATION_TIMEOUT", 120)?),
            cleanup_interval: (cleanup_secs > 0).then(|| Duration::from_secs(cleanup_secs)),
            source: SourceRepository {
                owner,
                repo,
                branch: var("GITHUB_BRANCH").unwrap_or_else(|| "main".to_string()),
            },
            webhook_secret: var("WEBHOOK_SECRET"),
            topology: Topology {
                vpc_attached: flag(&var, "VPC_ATTACHED")?,
                notifications: flag(&var, "NOTIFICATIONS")?,
                identity_pool: flag(&var, "IDENTITY_POOL")?,
                migration_callback: flag(&var, "MIGRATION_CALLBACK")?,
                maintenance_schedule: cleanup_secs > 0,
            },
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.build_commands.is_empty() {
            anyhow::bail!("BUILD_COMMANDS must contain at least one command");
        }

        if self.migration_timeout.is_zero() {
            anyhow::bail!("MIGRATION_TIMEOUT must be greater than 0");
        }

        if self.build_timeout.is_zero() {
            anyhow::bail!("BUILD_TIMEOUT must be greater than 0");
        }

        let names = [
            &self.targets.application,
            &self.targets.migration,
            &self.targets.cleanup,
        ];
        if names[0] == names[1] || names[1] == names[2] || names[0] == names[2] {
            anyhow::bail!("application, migration and cleanup units must be distinct");
        }

        if let Some(url) = &self.registry_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("REGISTRY_URL must start with http:// or https://");
            }
        }

        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            artifact_name: self.artifact_name.clone(),
            targets: self.targets.clone(),
            migration_timeout: self.migration_timeout,
        }
    }
}

fn seconds(var: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match var(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a number of seconds, got '{}'", key, value)),
        None => Ok(default),
    }
}

fn flag(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool> {
    match var(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(true),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => anyhow::bail!("{} must be a boolean, got '{}'", key, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [("GITHUB_USERNAME", "acme"), ("GITHUB_REPOSITORY", "shop")];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.database_url.is_none());
        assert!(config.webhook_secret.is_none());
        assert_eq!(config.artifact_name, "lambda.zip");
        assert_eq!(config.build_output, "lambda.zip");
        assert_eq!(config.migration_timeout, Duration::from_secs(120));
        assert_eq!(config.cleanup_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.source.branch, "main");
        assert_eq!(config.targets, ReleaseTargets::default());
        assert!(config.topology.vpc_attached);
        assert!(!config.build_commands.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_repository_fails() {
        let err = Config::from_lookup(lookup(&[("GITHUB_USERNAME", "acme")])).unwrap_err();
        assert!(err.to_string().contains("GITHUB_REPOSITORY"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("BUILD_COMMANDS", "make ; make package;"),
            ("BUILD_OUTPUT", "dist/out.zip"),
            ("MIGRATION_TIMEOUT", "30"),
            ("CLEANUP_INTERVAL", "0"),
            ("VPC_ATTACHED", "false"),
            ("MIGRATION_UNIT", "Migrator"),
            ("GITHUB_BRANCH", "release"),
            ("WEBHOOK_SECRET", "s3cret"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.build_commands, vec!["make", "make package"]);
        assert_eq!(config.build_output, "dist/out.zip");
        assert_eq!(config.migration_timeout, Duration::from_secs(30));
        assert_eq!(config.cleanup_interval, None);
        assert!(!config.topology.maintenance_schedule);
        assert!(!config.topology.vpc_attached);
        assert_eq!(config.pipeline_settings().targets.migration, "Migrator");
        assert_eq!(config.source.branch, "release");
        assert_eq!(config.webhook_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MIGRATION_TIMEOUT", "soon"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("NOTIFICATIONS", "maybe"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("APPLICATION_UNIT", "CleanUpLambda"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_repository_match_is_case_insensitive() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert!(config.source.matches("Acme", "Shop"));
        assert!(!config.source.matches("acme", "other"));
    }
}
