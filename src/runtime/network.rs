// ABOUTME: Shared bridge network operations.
// ABOUTME: One fixed network joins the proxy and every managed container.

use super::error::{map_network_create_error, map_network_remove_error, NetworkError};
use super::{with_cancel, RuntimeClient};
use crate::types::NetworkId;
use bollard::models::NetworkCreateRequest;
use tokio_util::sync::CancellationToken;

impl RuntimeClient {
    pub async fn network_exists(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<bool, NetworkError> {
        let result = with_cancel(cancel, async {
            self.client
                .inspect_network(
                    name,
                    None::<bollard::query_parameters::InspectNetworkOptions>,
                )
                .await
                .map_err(|e| match &e {
                    bollard::errors::Error::DockerResponseServerError {
                        status_code: 404, ..
                    } => NetworkError::NotFound(name.to_string()),
                    _ => NetworkError::Runtime(e.to_string()),
                })
        })
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(NetworkError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create the shared network if it does not exist yet. Bridge driver,
    /// IPv6 off, attachable so the proxy can resolve containers by name.
    pub async fn ensure_network(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<Option<NetworkId>, NetworkError> {
        if self.network_exists(cancel, name).await? {
            tracing::debug!("network '{name}' already exists");
            return Ok(None);
        }

        let request = NetworkCreateRequest {
            name: name.to_string(),
            driver: Some("bridge".to_string()),
            enable_ipv6: Some(false),
            attachable: Some(true),
            ..Default::default()
        };

        let response = with_cancel(cancel, async {
            self.client
                .create_network(request)
                .await
                .map_err(map_network_create_error)
        })
        .await?;

        tracing::info!("created network '{name}'");
        Ok(Some(NetworkId::new(response.id)))
    }

    /// Remove the shared network. A missing network is not an error.
    pub async fn remove_network(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<(), NetworkError> {
        let result = with_cancel(cancel, async {
            self.client
                .remove_network(name)
                .await
                .map_err(map_network_remove_error)
        })
        .await;

        match result {
            Err(NetworkError::NotFound(_)) => {
                tracing::debug!("network '{name}' already gone");
                Ok(())
            }
            other => other,
        }
    }
}
