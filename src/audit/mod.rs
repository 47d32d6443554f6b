// ABOUTME: Append-only NDJSON audit of deploy and approve workflows.
// ABOUTME: One JSON object per line; appends are serialized by an in-process mutex.

use crate::config::deployments_log_path;
use crate::types::Environment;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;

/// Serializes appends from concurrent workflows (CLI and control plane) in
/// this process. Cross-process safety is out of scope: one reflow per host.
static APPEND_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Deploy,
    Approve,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Deploy => f.write_str("deploy"),
            EventType::Approve => f.write_str("approve"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Started,
    Success,
    Failure,
}

/// One line of the deployments log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub project_name: String,
    pub environment: String,
    #[serde(rename = "commitSHA")]
    pub commit_sha: String,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
}

impl DeploymentEvent {
    pub fn new(
        event_type: EventType,
        project: &str,
        env: Environment,
        commit_sha: &str,
        outcome: Outcome,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            project_name: project.to_string(),
            environment: env.to_string(),
            commit_sha: commit_sha.to_string(),
            outcome,
            error_message: None,
            duration_ms: None,
            triggered_by: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.triggered_by = Some(trigger.into());
        self
    }
}

/// Append an event to the project's deployments log.
///
/// Audit failures are logged, never propagated: a deployment must not fail
/// because its paper trail could not be written.
pub fn record(base: &Path, project: &str, event: &DeploymentEvent) {
    let _guard = APPEND_LOCK.lock();

    let path = deployments_log_path(base, project);
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("failed to create audit log directory for {}: {e}", project);
            return;
        }
    }

    let mut line = match serde_json::to_string(event) {
        Ok(line) => line,
        Err(e) => {
            tracing::error!("failed to serialize audit event for {}: {e}", project);
            return;
        }
    };
    line.push('\n');

    let result = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .and_then(|mut file| file.write_all(line.as_bytes()));

    if let Err(e) = result {
        tracing::error!("failed to append audit event to {}: {e}", path.display());
    }
}

/// Filters and pagination for reading deployment history.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub environment: Option<Environment>,
    pub outcome: Option<Outcome>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

const DEFAULT_LIMIT: usize = 25;

/// Read deployment history, newest first.
///
/// Malformed lines are skipped with a warning rather than poisoning the
/// whole history.
pub fn history(
    base: &Path,
    project: &str,
    query: &HistoryQuery,
) -> std::io::Result<Vec<DeploymentEvent>> {
    let path = deployments_log_path(base, project);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut events: Vec<DeploymentEvent> = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!(
                    "skipping malformed audit line {} in {}: {e}",
                    number + 1,
                    path.display()
                );
            }
        }
    }

    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let env_filter = query.environment.map(|e| e.to_string());
    let filtered: Vec<DeploymentEvent> = events
        .into_iter()
        .filter(|event| {
            env_filter
                .as_ref()
                .is_none_or(|env| event.environment.eq_ignore_ascii_case(env))
        })
        .filter(|event| query.outcome.is_none_or(|outcome| event.outcome == outcome))
        .collect();

    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(filtered.into_iter().skip(offset).take(limit).collect())
}
