// ABOUTME: The promote-to-production workflow.
// ABOUTME: Reuses the image validated in staging; no rebuild ever happens here.

use std::path::Path;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::audit::{self, DeploymentEvent, EventType, Outcome};
use crate::config;
use crate::runtime::RuntimeClient;
use crate::types::{Environment, ProjectName, Slot};

use super::deploy::{run_rollout, RolloutOutcome};
use super::error::DeployError;
use super::rollout::{image_tag, Rollout};
use super::state::Prepared;

/// Promote the commit currently active in staging to production.
pub async fn approve(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    trigger: &str,
    cancel: &CancellationToken,
) -> Result<RolloutOutcome, DeployError> {
    tracing::info!("starting approval of project '{project}' for production");
    let started_at = Instant::now();

    // The staging commit isn't known until state is loaded; the started
    // event records the intent.
    audit::record(
        base,
        project.as_str(),
        &DeploymentEvent::new(
            EventType::Approve,
            project.as_str(),
            Environment::Production,
            "",
            Outcome::Started,
        )
        .with_trigger(trigger),
    );

    let result = run_approve(docker, base, project, cancel).await;
    let duration_ms = started_at.elapsed().as_millis() as u64;

    match &result {
        Ok(outcome) => {
            audit::record(
                base,
                project.as_str(),
                &DeploymentEvent::new(
                    EventType::Approve,
                    project.as_str(),
                    Environment::Production,
                    outcome.commit.as_str(),
                    Outcome::Success,
                )
                .with_duration_ms(duration_ms)
                .with_trigger(trigger),
            );
        }
        Err(e) => {
            audit::record(
                base,
                project.as_str(),
                &DeploymentEvent::new(
                    EventType::Approve,
                    project.as_str(),
                    Environment::Production,
                    "",
                    Outcome::Failure,
                )
                .with_error(e.to_string())
                .with_duration_ms(duration_ms)
                .with_trigger(trigger),
            );
        }
    }

    result
}

async fn run_approve(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    cancel: &CancellationToken,
) -> Result<RolloutOutcome, DeployError> {
    let env = Environment::Production;
    let proj_cfg = config::load_project(base, project.as_str())?;
    let state = config::load_state(base, project.as_str())?;

    // --- Refuse without a validated staging deployment.
    let staging = state.env(Environment::Staging);
    if !staging.is_deployed() {
        return Err(DeployError::NothingToApprove(project.to_string()));
    }
    let commit = staging
        .active_commit()
        .ok_or_else(|| DeployError::NothingToApprove(project.to_string()))?;
    tracing::info!(
        "approving commit {} currently active in staging (slot {})",
        commit.short(),
        staging.active_slot
    );

    // --- Image existence is the gate: approve never builds.
    let tag = image_tag(project, &commit);
    if docker.find_image(cancel, &tag).await?.is_none() {
        return Err(DeployError::ApprovedImageMissing(tag));
    }

    let slot = Slot::next_inactive(state.env(env).active_slot());
    tracing::info!(
        "targeting production inactive slot {} (active: {})",
        slot,
        state.env(env).active_slot
    );

    let env_file = proj_cfg
        .environment(env)
        .and_then(|e| e.env_file.clone())
        .map(|f| config::repo_path(base, project.as_str()).join(f));
    let env_vars = config::load_env_file(env_file.as_deref()).map_err(DeployError::EnvFile)?;

    let rollout = Rollout::<Prepared>::new(
        base.to_path_buf(),
        project.clone(),
        proj_cfg,
        state,
        env,
        commit,
        slot,
        env_vars,
    );

    run_rollout(rollout, docker, cancel).await
}
