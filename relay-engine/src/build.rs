//! Build procedures
//!
//! A build procedure turns a source snapshot into the bytes of one
//! deployment package. Storing the package is the build stage's job.

use async_trait::async_trait;
use relay_core::domain::source::SourceSnapshot;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::context::StageLog;
use crate::error::StageError;

/// Lines of command output kept per command in the stage log
const MAX_OUTPUT_LINES: usize = 200;

/// Produces a deployment package from a snapshot
#[async_trait]
pub trait BuildProcedure: Send + Sync {
    async fn build(&self, snapshot: &SourceSnapshot, log: &StageLog)
    -> Result<Vec<u8>, StageError>;
}

/// Runs a list of shell commands in the snapshot's working tree and reads
/// the packaged output file
#[derive(Debug, Clone)]
pub struct ShellBuild {
    commands: Vec<String>,
    /// Package path relative to the working tree
    output: PathBuf,
    timeout: Duration,
    env: Vec<(String, String)>,
}

impl ShellBuild {
    pub fn new(commands: Vec<String>, output: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            commands,
            output: output.into(),
            timeout,
            env: Vec::new(),
        }
    }

    /// Adds an environment variable visible to every command
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Default package recipe: compile the application, migration and
    /// cleanup entry points and zip them with their dependencies
    pub fn default_commands() -> Vec<String> {
        [
            "npm i --omit=dev",
            "npm run build",
            "npm run build:migrate",
            "npm run build:cleanup",
            "npm run build:transform",
            "node dist/transform.js",
            "mv dist/lambda.js ./",
            "mv dist/migrate.js ./",
            "mv dist/cleanup.js ./",
            "mv dist/migrations ./",
            "zip -r lambda.zip lambda.js migrate.js cleanup.js node_modules package.json package-lock.json migrations",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect()
    }

    async fn run_commands(&self, workdir: &std::path::Path, log: &StageLog) -> Result<(), StageError> {
        for command in &self.commands {
            log.log_info(format!("$ {}", command));
            debug!("Running build command: {}", command);

            let output = Command::new("sh")
                .arg("-c")
                .arg(command)
                .current_dir(workdir)
                .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| StageError::BuildFailure {
                    exit_reason: format!("failed to spawn `{}`: {}", command, e),
                })?;

            capture_output(log, &output.stdout, false);
            capture_output(log, &output.stderr, !output.status.success());

            if !output.status.success() {
                return Err(StageError::BuildFailure {
                    exit_reason: format!("`{}` exited with {}", command, output.status),
                });
            }
        }

        Ok(())
    }
}

fn capture_output(log: &StageLog, bytes: &[u8], as_error: bool) {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(MAX_OUTPUT_LINES);

    for line in &lines[skip..] {
        if as_error {
            log.log_error(*line);
        } else {
            log.log_debug(*line);
        }
    }
}

#[async_trait]
impl BuildProcedure for ShellBuild {
    async fn build(
        &self,
        snapshot: &SourceSnapshot,
        log: &StageLog,
    ) -> Result<Vec<u8>, StageError> {
        let workdir = snapshot
            .workdir
            .as_deref()
            .ok_or_else(|| StageError::BuildFailure {
                exit_reason: "source snapshot has no working tree".to_string(),
            })?;

        info!(
            "Building {} ({} command(s)) in {}",
            snapshot.commit_ref,
            self.commands.len(),
            workdir.display()
        );

        tokio::time::timeout(self.timeout, self.run_commands(workdir, log))
            .await
            .map_err(|_| StageError::BuildFailure {
                exit_reason: format!("build timed out after {:?}", self.timeout),
            })??;

        let output_path = workdir.join(&self.output);
        tokio::fs::read(&output_path)
            .await
            .map_err(|e| StageError::BuildFailure {
                exit_reason: format!(
                    "build output {} unreadable: {}",
                    output_path.display(),
                    e
                ),
            })
    }
}
