// ABOUTME: Cleanup workflow: remove superseded containers and optionally prune images.
// ABOUTME: Errors are collected and joined; the sweep never stops at the first failure.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config;
use crate::runtime::{
    RuntimeClient, LABEL_COMMIT, LABEL_ENVIRONMENT, LABEL_PROJECT, LABEL_SLOT,
};
use crate::types::{Environment, ProjectName};

use super::error::DeployError;

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// What a cleanup pass accomplished.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub containers_removed: usize,
    pub images_removed: usize,
}

/// Remove every container for the requested environments that does not match
/// the active slot+commit tuple, and optionally prune superseded images.
pub async fn cleanup(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    envs: &[Environment],
    prune_images: bool,
    cancel: &CancellationToken,
) -> Result<CleanupReport, (CleanupReport, DeployError)> {
    let mut report = CleanupReport::default();
    let mut errors: Vec<String> = Vec::new();

    for &env in envs {
        match cleanup_env(docker, base, project, env, cancel).await {
            Ok((removed, env_errors)) => {
                report.containers_removed += removed;
                errors.extend(env_errors);
            }
            Err(e) => errors.push(e.to_string()),
        }
    }

    if prune_images {
        match prune_project_images(docker, base, project, cancel).await {
            Ok((pruned, prune_errors)) => {
                report.images_removed += pruned;
                errors.extend(prune_errors);
            }
            Err(e) => errors.push(e.to_string()),
        }
    }

    if errors.is_empty() {
        Ok(report)
    } else {
        let err = DeployError::aggregate("errors during cleanup", errors);
        Err((report, err))
    }
}

/// Remove inactive containers for one environment. Returns the removed count
/// and any per-container errors.
async fn cleanup_env(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    env: Environment,
    cancel: &CancellationToken,
) -> Result<(usize, Vec<String>), DeployError> {
    tracing::info!("starting cleanup for '{project}', environment '{env}'");

    let state = config::load_state(base, project.as_str())?;
    let env_state = state.env(env);
    if !env_state.is_deployed() {
        tracing::info!("no active deployment for '{project}'/{env}, skipping container cleanup");
        return Ok((0, Vec::new()));
    }

    let project_str = project.to_string();
    let env_str = env.to_string();
    let containers = docker
        .find_containers_by_labels(
            cancel,
            &[(LABEL_PROJECT, &project_str), (LABEL_ENVIRONMENT, &env_str)],
        )
        .await?;

    let mut removed = 0;
    let mut errors = Vec::new();

    for container in containers {
        let slot = container.label(LABEL_SLOT);
        let commit = container.label(LABEL_COMMIT);
        let is_active = slot == env_state.active_slot && commit == env_state.active_commit;

        if is_active {
            tracing::debug!(
                "keeping active container {} ({})",
                container.name,
                container.id.short()
            );
            continue;
        }

        tracing::warn!(
            "removing inactive container {} (slot {}, commit {})",
            container.name,
            slot,
            &commit[..commit.len().min(7)]
        );

        // The container may be stopped already; stop errors are not fatal.
        if let Err(e) = docker
            .stop_container(cancel, &container.id, Some(STOP_TIMEOUT))
            .await
        {
            tracing::debug!(
                "ignoring stop error for {}: {e}",
                container.id.short()
            );
        }

        match docker.remove_container(cancel, &container.id).await {
            Ok(()) => removed += 1,
            Err(e) => errors.push(format!(
                "failed to remove container {} ({}): {e}",
                container.name,
                container.id.short()
            )),
        }
    }

    tracing::info!("container cleanup for '{project}'/{env} removed {removed} container(s)");
    Ok((removed, errors))
}

/// Remove project images whose tag matches neither environment's active
/// commit. Both staging and production commits are always kept.
async fn prune_project_images(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    cancel: &CancellationToken,
) -> Result<(usize, Vec<String>), DeployError> {
    tracing::warn!("pruning images for '{project}' not active in staging or production");

    let state = config::load_state(base, project.as_str())?;
    let mut active_commits = Vec::new();
    if !state.test.active_commit.is_empty() {
        active_commits.push(state.test.active_commit.clone());
    }
    if !state.prod.active_commit.is_empty() {
        active_commits.push(state.prod.active_commit.clone());
    }

    if active_commits.is_empty() {
        tracing::info!("no active deployments for '{project}', skipping image prune");
        return Ok((0, Vec::new()));
    }

    let prefix = format!("{project}:");
    let images = docker.list_images(cancel).await?;

    let mut pruned = 0;
    let mut errors = Vec::new();

    for image in images {
        let Some(commit) = image
            .repo_tags
            .iter()
            .find_map(|tag| tag.strip_prefix(&prefix))
        else {
            continue;
        };

        if active_commits.iter().any(|active| active == commit) {
            tracing::debug!("keeping active image {}:{}", project, &commit[..7.min(commit.len())]);
            continue;
        }

        tracing::warn!(
            "pruning image {} (commit {})",
            image.id.short(),
            &commit[..7.min(commit.len())]
        );
        match docker.remove_image(cancel, &image.id).await {
            Ok(()) => pruned += 1,
            Err(e) => errors.push(format!("failed to prune image {}: {e}", image.id.short())),
        }
    }

    tracing::info!("image pruning for '{project}' removed {pruned} image(s)");
    Ok((pruned, errors))
}
