// ABOUTME: Start and stop the active container of a project environment.
// ABOUTME: A stopped container matching the active state is intentionally stopped, not failed.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::config;
use crate::runtime::{RuntimeClient, LABEL_ENVIRONMENT, LABEL_PROJECT, LABEL_SLOT};
use crate::types::{Environment, ProjectName};

use super::error::DeployError;

/// Stop the active container(s) for a project environment.
pub async fn stop_project_env(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    env: Environment,
    cancel: &CancellationToken,
) -> Result<usize, DeployError> {
    let Some(containers) = active_containers(docker, base, project, env, cancel).await? else {
        return Ok(0);
    };

    let mut stopped = 0;
    for container in &containers {
        match docker.stop_container(cancel, &container.id, None).await {
            Ok(()) => {
                tracing::info!("stopped container {} ({})", container.name, container.id.short());
                stopped += 1;
            }
            Err(e) => {
                tracing::error!(
                    "failed to stop container {} ({}): {e}",
                    container.name,
                    container.id.short()
                );
            }
        }
    }

    if stopped == 0 && !containers.is_empty() {
        return Err(DeployError::Aggregate(format!(
            "attempted to stop {} container(s), but failed for all",
            containers.len()
        )));
    }

    Ok(stopped)
}

/// Start the previously stopped active container(s) for a project environment.
pub async fn start_project_env(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    env: Environment,
    cancel: &CancellationToken,
) -> Result<usize, DeployError> {
    let Some(containers) = active_containers(docker, base, project, env, cancel).await? else {
        return Ok(0);
    };

    let mut started = 0;
    for container in &containers {
        if container.is_running() {
            tracing::info!(
                "container {} ({}) is already running",
                container.name,
                container.id.short()
            );
            started += 1;
            continue;
        }

        match docker.start_container(cancel, &container.id).await {
            Ok(()) => {
                tracing::info!("started container {} ({})", container.name, container.id.short());
                started += 1;
            }
            Err(e) => {
                tracing::error!(
                    "failed to start container {} ({}): {e}",
                    container.name,
                    container.id.short()
                );
            }
        }
    }

    if started == 0 && !containers.is_empty() {
        return Err(DeployError::Aggregate(format!(
            "attempted to start {} container(s), but failed for all",
            containers.len()
        )));
    }

    Ok(started)
}

/// Containers in the active slot per state. `None` when the environment has
/// never been deployed; an empty list when state and labels disagree.
async fn active_containers(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    env: Environment,
    cancel: &CancellationToken,
) -> Result<Option<Vec<crate::runtime::ContainerSummary>>, DeployError> {
    let state = config::load_state(base, project.as_str())?;
    let env_state = state.env(env);

    if !env_state.is_deployed() {
        tracing::info!("no active deployment for '{project}'/{env}; nothing to do");
        return Ok(None);
    }

    let project_str = project.to_string();
    let env_str = env.to_string();
    let containers = docker
        .find_containers_by_labels(
            cancel,
            &[
                (LABEL_PROJECT, &project_str),
                (LABEL_ENVIRONMENT, &env_str),
                (LABEL_SLOT, &env_state.active_slot),
            ],
        )
        .await?;

    if containers.is_empty() {
        tracing::warn!(
            "state says '{project}'/{env} is active in slot {}, but no matching container exists",
            env_state.active_slot
        );
    }

    Ok(Some(containers))
}
