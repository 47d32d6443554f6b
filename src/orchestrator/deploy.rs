// ABOUTME: The deploy-to-staging workflow: acquire source, build, roll out.
// ABOUTME: Audit events bracket the attempt; rollback unwinds a failed launch.

use std::path::Path;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::audit::{self, DeploymentEvent, EventType, Outcome};
use crate::config;
use crate::git;
use crate::recipe;
use crate::runtime::RuntimeClient;
use crate::types::{CommitHash, Environment, ProjectName, Slot};

use super::error::DeployError;
use super::rollout::Rollout;
use super::state::Prepared;

/// What a finished rollout looks like to the caller.
#[derive(Debug, Clone)]
pub struct RolloutOutcome {
    pub commit: CommitHash,
    pub slot: Slot,
    pub container_name: String,
    pub domain: Option<String>,
}

/// Deploy a project revision to the staging environment.
///
/// `revision` may be a branch, tag, or (short) hash; empty means the tip of
/// the default branch. `trigger` records who started this (cli or api).
pub async fn deploy(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    revision: Option<&str>,
    trigger: &str,
    cancel: &CancellationToken,
) -> Result<RolloutOutcome, DeployError> {
    tracing::info!("starting deployment of project '{project}' to staging");
    let started_at = Instant::now();

    audit::record(
        base,
        project.as_str(),
        &DeploymentEvent::new(
            EventType::Deploy,
            project.as_str(),
            Environment::Staging,
            revision.unwrap_or("HEAD"),
            Outcome::Started,
        )
        .with_trigger(trigger),
    );

    let result = run_deploy(docker, base, project, revision, cancel).await;
    let duration_ms = started_at.elapsed().as_millis() as u64;

    match &result {
        Ok(outcome) => {
            audit::record(
                base,
                project.as_str(),
                &DeploymentEvent::new(
                    EventType::Deploy,
                    project.as_str(),
                    Environment::Staging,
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
                    EventType::Deploy,
                    project.as_str(),
                    Environment::Staging,
                    revision.unwrap_or("HEAD"),
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

async fn run_deploy(
    docker: &RuntimeClient,
    base: &Path,
    project: &ProjectName,
    revision: Option<&str>,
    cancel: &CancellationToken,
) -> Result<RolloutOutcome, DeployError> {
    let env = Environment::Staging;
    let repo = config::repo_path(base, project.as_str());

    // --- Load configs; absent state or global config means first deployment.
    let proj_cfg = config::load_project(base, project.as_str())?;
    let state = match config::load_state(base, project.as_str()) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("could not load project state, assuming first deployment: {e}");
            Default::default()
        }
    };

    // --- Resolve the target commit against a fresh fetch.
    git::fetch(cancel, &repo).await?;
    let commit = git::resolve(cancel, &repo, revision.unwrap_or("")).await?;
    tracing::info!(
        "resolved '{}' to commit {}",
        revision.unwrap_or("HEAD"),
        commit
    );
    git::checkout(cancel, &repo, &commit).await?;

    // --- Pick the slot the rollout targets.
    let slot = Slot::next_inactive(state.env(env).active_slot());
    tracing::info!(
        "targeting inactive slot {} (active: {})",
        slot,
        state.env(env).active_slot
    );

    // --- Build the image. Build errors terminate with nothing to unwind.
    let tag = super::rollout::image_tag(project, &commit);
    let recipe_content = recipe::render_recipe(&proj_cfg.runtime_version, proj_cfg.app_port)?;
    {
        let _recipe = recipe::MaterializedRecipe::write(&repo, &recipe_content)
            .map_err(DeployError::BuildContext)?;
        let context = recipe::build_context_tar(&repo).map_err(DeployError::BuildContext)?;
        docker
            .build_image(cancel, context, recipe::RECIPE_FILE, &tag)
            .await?;
        // _recipe drops here, removing the temp file from the checkout.
    }

    // --- Environment variables for the new container.
    let env_file = proj_cfg
        .environment(env)
        .and_then(|e| e.env_file.clone())
        .map(|f| repo.join(f));
    let env_vars = config::load_env_file(env_file.as_deref()).map_err(DeployError::EnvFile)?;

    // --- Drive the rollout machine.
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

/// Run a prepared rollout through launch, health, traffic switch, and state
/// persistence, unwinding the launch on the failures the spec rolls back.
pub(super) async fn run_rollout(
    rollout: Rollout<Prepared>,
    docker: &RuntimeClient,
    cancel: &CancellationToken,
) -> Result<RolloutOutcome, DeployError> {
    let rollout = rollout.launch(docker, cancel).await?;

    let rollout = match rollout.verify_health(docker, cancel).await {
        Ok(rollout) => rollout,
        Err((failed, e)) => {
            tracing::error!("health verification failed: {e}");
            failed.rollback(docker).await?;
            return Err(e);
        }
    };

    let rollout = match rollout.switch_traffic(docker, cancel).await {
        Ok(rollout) => rollout,
        Err((failed, e)) => {
            tracing::error!("traffic switch failed: {e}");
            failed.rollback(docker).await?;
            return Err(e);
        }
    };

    let rollout = rollout.commit_state()?;

    Ok(RolloutOutcome {
        commit: rollout.commit().clone(),
        slot: rollout.slot(),
        container_name: rollout.container_name(),
        domain: rollout.domain().map(String::from),
    })
}
