// ABOUTME: Error type for deployment workflows.
// ABOUTME: Aggregates the lower layers' tagged variants; state persist failures are critical.

use crate::config::ConfigError;
use crate::git::GitError;
use crate::proxy::ProxyError;
use crate::runtime::{ClientError, ContainerError, ExecError, ImageError, NetworkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Probe(#[from] ExecError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("container '{name}' failed health check: timed out after {seconds}s")]
    HealthTimeout { name: String, seconds: u64 },

    #[error("no active staging deployment found for project '{0}' to approve")]
    NothingToApprove(String),

    #[error("approved image {0} not found locally; was the staging deployment successful?")]
    ApprovedImageMissing(String),

    #[error("deployment is live but saving state failed; state file is stale: {0}")]
    StatePersistFailed(#[source] ConfigError),

    #[error("recipe error: {0}")]
    Recipe(#[from] crate::template::TemplateError),

    #[error("failed to read build context: {0}")]
    BuildContext(#[source] std::io::Error),

    #[error("failed to load environment file: {0}")]
    EnvFile(#[source] std::io::Error),

    #[error("workflow cancelled")]
    Cancelled,

    #[error("{0}")]
    Aggregate(String),
}

impl DeployError {
    /// Whether this error reached the point of no return: traffic already
    /// shifted, so nothing may be reverted.
    pub fn is_critical(&self) -> bool {
        matches!(self, DeployError::StatePersistFailed(_))
    }

    /// Collapse a list of collected error strings into one error.
    pub fn aggregate(label: &str, errors: Vec<String>) -> Self {
        DeployError::Aggregate(format!("{label}:\n - {}", errors.join("\n - ")))
    }
}
