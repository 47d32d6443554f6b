// ABOUTME: Destroy-all workflow: tear down every managed resource and the base directory.
// ABOUTME: Accumulates errors at every stage; never stops at the first failure.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{NETWORK_NAME, PROXY_CONTAINER_NAME};
use crate::runtime::RuntimeClient;

use super::error::DeployError;

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Stop and remove all managed containers, the proxy container, the shared
/// network, and recursively delete the base directory.
///
/// Asks for confirmation on stdin unless `force`. Idempotent: re-running
/// against an already-destroyed host succeeds with zero work.
pub async fn destroy_all(
    docker: &RuntimeClient,
    base: &Path,
    force: bool,
    cancel: &CancellationToken,
) -> Result<(), DeployError> {
    tracing::warn!("this will stop and remove ALL managed containers and the proxy,");
    tracing::warn!("remove the '{NETWORK_NAME}' network,");
    tracing::warn!("and IRREVERSIBLY DELETE the base directory: {}", base.display());

    if !force {
        if !confirm().await? {
            tracing::info!("destruction cancelled by user");
            return Ok(());
        }
    } else {
        tracing::warn!("skipping confirmation due to --force");
    }

    let mut errors: Vec<String> = Vec::new();

    // --- Application containers.
    match docker.list_managed_containers(cancel).await {
        Ok(containers) => {
            tracing::info!("found {} managed container(s) to remove", containers.len());
            for container in containers {
                tracing::warn!(
                    "stopping and removing container {} ({})",
                    container.name,
                    container.id.short()
                );
                let _ = docker
                    .stop_container(cancel, &container.id, Some(STOP_TIMEOUT))
                    .await;
                if let Err(e) = docker.remove_container(cancel, &container.id).await {
                    errors.push(format!(
                        "failed to remove container {}: {e}",
                        container.id.short()
                    ));
                }
            }
        }
        Err(e) => errors.push(format!("failed to list managed containers: {e}")),
    }

    // --- Proxy container. It is unlabeled, addressed by its fixed name.
    tracing::warn!("stopping and removing proxy container '{PROXY_CONTAINER_NAME}'");
    match docker.inspect_container(cancel, PROXY_CONTAINER_NAME).await {
        Ok(proxy) => {
            let _ = docker
                .stop_container(cancel, &proxy.id, Some(STOP_TIMEOUT))
                .await;
            if let Err(e) = docker.remove_container(cancel, &proxy.id).await {
                errors.push(format!("failed to remove proxy container: {e}"));
            }
        }
        Err(crate::runtime::ContainerError::NotFound(_)) => {
            tracing::debug!("proxy container already gone");
        }
        Err(e) => errors.push(format!("failed to inspect proxy container: {e}")),
    }

    // --- Shared network.
    tracing::info!("removing network '{NETWORK_NAME}'");
    if let Err(e) = docker.remove_network(cancel, NETWORK_NAME).await {
        errors.push(format!("failed to remove network {NETWORK_NAME}: {e}"));
    }

    // --- Base directory.
    if base.exists() {
        tracing::warn!("deleting base directory: {}", base.display());
        if let Err(e) = std::fs::remove_dir_all(base) {
            errors.push(format!(
                "failed to delete base directory {}: {e}",
                base.display()
            ));
        }
    }

    if errors.is_empty() {
        tracing::info!("environment destroyed successfully");
        Ok(())
    } else {
        Err(DeployError::aggregate("errors during destroy", errors))
    }
}

/// Read a yes/no confirmation from stdin.
async fn confirm() -> Result<bool, DeployError> {
    let answer = tokio::task::spawn_blocking(|| {
        print!("Are you absolutely sure you want to proceed? (Type 'yes' to confirm): ");
        let _ = std::io::stdout().flush();
        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map(|_| input.trim().eq_ignore_ascii_case("yes"))
    })
    .await
    .map_err(|e| DeployError::Aggregate(format!("failed to read confirmation: {e}")))?
    .map_err(|e| DeployError::Aggregate(format!("failed to read confirmation: {e}")))?;

    Ok(answer)
}
