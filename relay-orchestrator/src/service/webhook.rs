//! Webhook Service
//!
//! Turns source-control push events into release triggers. Only pushes of
//! new commits to the configured branch of the configured repository start
//! a release.

use relay_core::domain::source::Trigger;
use relay_core::dto::run::TriggerAccepted;
use serde::Deserialize;

use crate::config::SourceRepository;
use crate::service::run::{RunError, trigger_release};
use crate::state::AppState;

/// The parts of a GitHub push event the release train needs
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub after: String,
    #[serde(default)]
    pub deleted: bool,
    pub repository: PushRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushRepository {
    pub name: String,
    pub owner: PushOwner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushOwner {
    /// Present in webhook payloads
    pub login: Option<String>,
    /// Present in payloads built from the repository API
    pub name: Option<String>,
}

impl PushOwner {
    fn id(&self) -> Option<&str> {
        self.login.as_deref().or(self.name.as_deref())
    }
}

/// Trigger for `event`, or `None` when the push does not concern the release
pub fn trigger_for(event: &PushEvent, source: &SourceRepository) -> Option<Trigger> {
    let owner = event.repository.owner.id()?;
    if !source.matches(owner, &event.repository.name) {
        return None;
    }

    let branch = event.git_ref.strip_prefix("refs/heads/")?;
    if branch != source.branch {
        return None;
    }

    if event.deleted || event.after.is_empty() || event.after.chars().all(|c| c == '0') {
        return None;
    }

    Some(Trigger::new(
        &source.owner,
        &source.repo,
        branch,
        &event.after,
    ))
}

/// Queue a release for a push; `Ok(None)` when the push is ignored
pub async fn handle_push(
    state: &AppState,
    event: PushEvent,
) -> Result<Option<TriggerAccepted>, RunError> {
    match trigger_for(&event, &state.source) {
        Some(trigger) => trigger_release(state, trigger).await.map(Some),
        None => {
            tracing::debug!(
                "Ignoring push of {} to {}",
                event.git_ref,
                event.repository.name
            );
            Ok(None)
        }
    }
}
