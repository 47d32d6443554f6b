// ABOUTME: Connection to the local container daemon.
// ABOUTME: Connects via platform defaults and verifies the daemon responds.

use super::error::ClientError;
use bollard::Docker;

/// Handle to the local container daemon.
///
/// Cloning is cheap; bollard's client is an Arc around its transport.
#[derive(Clone)]
pub struct RuntimeClient {
    pub(crate) client: Docker,
}

impl RuntimeClient {
    /// Connect to the daemon using platform defaults and ping it once.
    pub async fn connect() -> Result<Self, ClientError> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| ClientError::Unavailable(format!("{e}. Is the daemon running?")))?;

        client
            .ping()
            .await
            .map_err(|e| ClientError::Unavailable(format!("{e}. Is the daemon running?")))?;

        tracing::debug!("container daemon connection established");
        Ok(Self { client })
    }

    /// Wrap an already-connected bollard client. Used by tests.
    pub fn from_docker(client: Docker) -> Self {
        Self { client }
    }
}
