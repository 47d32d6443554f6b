// ABOUTME: Per-project deployment state: which slot and commit are live per environment.
// ABOUTME: JSON on disk, never cached; container labels remain the authoritative index.

use super::{write_atomic, ConfigError, PROJECT_STATE_FILE};
use crate::types::{CommitHash, Environment, Slot};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Deployment state for one environment.
///
/// All fields serialize as plain strings; empty strings mean the environment
/// has never been deployed. Only a successful rollout mutates this, and only
/// at the very end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentState {
    #[serde(default)]
    pub active_slot: String,
    #[serde(default)]
    pub active_commit: String,
    #[serde(default)]
    pub inactive_slot: String,
    #[serde(default)]
    pub pending_commit: String,
}

impl EnvironmentState {
    pub fn is_deployed(&self) -> bool {
        !self.active_commit.is_empty() && !self.active_slot.is_empty()
    }

    pub fn active_slot(&self) -> Option<Slot> {
        self.active_slot.parse().ok()
    }

    pub fn active_commit(&self) -> Option<CommitHash> {
        CommitHash::new(&self.active_commit).ok()
    }

    /// Record a completed rollout: the targeted slot becomes active.
    pub fn record_rollout(&mut self, slot: Slot, commit: &CommitHash) {
        self.active_slot = slot.to_string();
        self.active_commit = commit.to_string();
        self.inactive_slot = slot.opposite().to_string();
        self.pending_commit = String::new();
    }
}

/// State for both environments of a project, `$BASE/apps/<project>/state.json`.
///
/// The JSON keys `test`/`prod` are the historical names for staging and
/// production and are kept for compatibility with existing state files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    #[serde(default)]
    pub test: EnvironmentState,
    #[serde(default)]
    pub prod: EnvironmentState,
}

impl ProjectState {
    pub fn env(&self, env: Environment) -> &EnvironmentState {
        match env {
            Environment::Staging => &self.test,
            Environment::Production => &self.prod,
        }
    }

    pub fn env_mut(&mut self, env: Environment) -> &mut EnvironmentState {
        match env {
            Environment::Staging => &mut self.test,
            Environment::Production => &mut self.prod,
        }
    }
}

/// Load a project's state, treating an absent file as never-deployed.
///
/// Deliberately uncached: external tools may rewrite the file between reads.
pub fn load_state(base: &Path, project: &str) -> Result<ProjectState, ConfigError> {
    let path = super::project_base_path(base, project).join(PROJECT_STATE_FILE);
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(
                "state file not found at {}, assuming never deployed",
                path.display()
            );
            return Ok(ProjectState::default());
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    serde_json::from_slice(&data).map_err(|source| ConfigError::InvalidState { path, source })
}

pub fn save_state(base: &Path, project: &str, state: &ProjectState) -> Result<(), ConfigError> {
    let path = super::project_base_path(base, project).join(PROJECT_STATE_FILE);
    let data = serde_json::to_vec_pretty(state).expect("project state serializes");
    write_atomic(&path, &data).map_err(|source| ConfigError::PersistFailed {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("saved project state to {}", path.display());
    Ok(())
}
