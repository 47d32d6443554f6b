// ABOUTME: State transition methods for the rollout machine.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Duration;

use bollard::models::RestartPolicyNameEnum;
use tokio_util::sync::CancellationToken;

use crate::config::{self, NETWORK_NAME};
use crate::health;
use crate::proxy;
use crate::runtime::{
    RunSpec, RuntimeClient, LABEL_COMMIT, LABEL_ENVIRONMENT, LABEL_MANAGED, LABEL_PROJECT,
    LABEL_SLOT,
};

use super::error::DeployError;
use super::rollout::Rollout;
use super::state::{Committed, HealthVerified, Launched, Prepared, TrafficShifted};

/// Result type for transitions that may need rollback on failure: the caller
/// gets the rollout back alongside the error so it can unwind the launch.
pub type TransitionResult<T, S> = Result<Rollout<T>, (Rollout<S>, DeployError)>;

/// Total budget for the readiness probe loop.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(60);
/// Cadence between probe attempts.
const HEALTH_INTERVAL: Duration = Duration::from_secs(5);
/// Grace period when stopping a superseded or rolled-back container.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

impl<S> Rollout<S> {
    /// Internal helper to transition to a new state.
    fn transition<T>(self) -> Rollout<T> {
        Rollout {
            base: self.base,
            project: self.project,
            config: self.config,
            state: self.state,
            env: self.env,
            commit: self.commit,
            slot: self.slot,
            env_vars: self.env_vars,
            new_container: self.new_container,
            domain: self.domain,
            _state: PhantomData,
        }
    }

    fn labels(&self) -> HashMap<String, String> {
        let mut labels = HashMap::new();
        labels.insert(LABEL_MANAGED.to_string(), "true".to_string());
        labels.insert(LABEL_PROJECT.to_string(), self.project.to_string());
        labels.insert(LABEL_ENVIRONMENT.to_string(), self.env.to_string());
        labels.insert(LABEL_SLOT.to_string(), self.slot.to_string());
        labels.insert(LABEL_COMMIT.to_string(), self.commit.to_string());
        labels
    }
}

// =============================================================================
// Prepared -> Launched
// =============================================================================

impl Rollout<Prepared> {
    /// Clear the target slot and start the new container in it.
    ///
    /// Failures here have nothing to unwind: either the old inactive
    /// container could not be purged (abort before creating anything) or
    /// the create/start itself failed (the runtime removes its own debris).
    ///
    /// # Errors
    ///
    /// Returns error if purging the slot or starting the container fails.
    #[must_use = "rollout state must be used"]
    pub async fn launch(
        mut self,
        docker: &RuntimeClient,
        cancel: &CancellationToken,
    ) -> Result<Rollout<Launched>, DeployError> {
        // Purge whatever previous deployment left in the target slot.
        let project = self.project.to_string();
        let env = self.env.to_string();
        let slot = self.slot.to_string();
        let stale = docker
            .find_containers_by_labels(
                cancel,
                &[
                    (LABEL_PROJECT, &project),
                    (LABEL_ENVIRONMENT, &env),
                    (LABEL_SLOT, &slot),
                ],
            )
            .await?;

        for container in &stale {
            tracing::warn!(
                "removing old container {} ({}) from inactive slot {}",
                container.name,
                container.id.short(),
                self.slot
            );
            docker
                .stop_container(cancel, &container.id, Some(STOP_TIMEOUT))
                .await?;
            docker.remove_container(cancel, &container.id).await?;
        }

        let mut env_vars = self.env_vars.clone();
        env_vars.push(format!("PORT={}", self.config.app_port));

        let spec = RunSpec {
            image: self.image_tag(),
            name: self.container_name(),
            network: NETWORK_NAME.to_string(),
            labels: self.labels(),
            env: env_vars,
            app_port: self.config.app_port,
            restart_policy: RestartPolicyNameEnum::UNLESS_STOPPED,
            publish_ports: Vec::new(),
            binds: Vec::new(),
        };

        tracing::info!("starting new container '{}' in slot {}", spec.name, self.slot);
        let id = docker.run_container(cancel, &spec).await?;
        tracing::info!("new container started: {} ({})", spec.name, id.short());

        self.new_container = Some(id);
        Ok(self.transition())
    }
}

// =============================================================================
// Launched -> HealthVerified
// =============================================================================

impl Rollout<Launched> {
    /// Poll the readiness probe until it passes or the budget runs out.
    ///
    /// Individual probe errors are retried; only the overall timeout (or
    /// cancellation) fails the transition.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on failure to allow rollback.
    #[must_use = "rollout state must be used"]
    pub async fn verify_health(
        self,
        docker: &RuntimeClient,
        cancel: &CancellationToken,
    ) -> TransitionResult<HealthVerified, Launched> {
        let name = self.container_name();
        let port = self.config.app_port;

        tracing::info!(
            "performing TCP health check from the proxy container (timeout {}s)",
            HEALTH_TIMEOUT.as_secs()
        );

        let start = tokio::time::Instant::now();
        while start.elapsed() < HEALTH_TIMEOUT {
            if cancel.is_cancelled() {
                return Err((self, DeployError::Cancelled));
            }

            match health::probe(docker, cancel, &name, port).await {
                Ok(true) => {
                    tracing::info!(
                        "container '{}' passed health check after {:?}",
                        name,
                        start.elapsed()
                    );
                    return Ok(self.transition());
                }
                Ok(false) => {
                    tracing::debug!("container '{}' not ready yet, retrying", name);
                }
                Err(e) => {
                    tracing::warn!("health check poll failed for '{}': {}", name, e);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err((self, DeployError::Cancelled)),
                _ = tokio::time::sleep(HEALTH_INTERVAL) => {}
            }
        }

        let err = DeployError::HealthTimeout {
            name,
            seconds: HEALTH_TIMEOUT.as_secs(),
        };
        Err((self, err))
    }

    /// Rollback: stop and remove the just-launched container.
    pub async fn rollback(self, docker: &RuntimeClient) -> Result<(), DeployError> {
        rollback_new_container(self, docker).await
    }
}

// =============================================================================
// HealthVerified -> TrafficShifted
// =============================================================================

impl Rollout<HealthVerified> {
    /// Point the proxy at the new container and reload it.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on failure to allow rollback; the previous
    /// proxy config is still in place and still serving.
    #[must_use = "rollout state must be used"]
    pub async fn switch_traffic(
        mut self,
        docker: &RuntimeClient,
        cancel: &CancellationToken,
    ) -> TransitionResult<TrafficShifted, HealthVerified> {
        if cancel.is_cancelled() {
            return Err((self, DeployError::Cancelled));
        }

        let global = match config::load_global(&self.base) {
            Ok(global) => global,
            Err(e) => return Err((self, e.into())),
        };

        let domain = match config::effective_domain(&global, &self.config, self.env) {
            Ok(domain) => domain,
            Err(e) => return Err((self, e.into())),
        };

        let content = match proxy::render_site_config(
            &self.project,
            self.env,
            self.slot,
            &self.container_name(),
            &domain,
            self.config.app_port,
        ) {
            Ok(content) => content,
            Err(e) => return Err((self, DeployError::Proxy(e.into()))),
        };

        if let Err(e) = proxy::write_site_config(&self.base, &self.project, self.env, &content) {
            return Err((self, e.into()));
        }

        if let Err(e) = proxy::reload(docker, cancel).await {
            return Err((self, e.into()));
        }

        tracing::info!("proxy reloaded, {} traffic switched to new container", self.env);
        self.domain = Some(domain);
        Ok(self.transition())
    }

    /// Rollback: stop and remove the just-launched container.
    pub async fn rollback(self, docker: &RuntimeClient) -> Result<(), DeployError> {
        rollback_new_container(self, docker).await
    }
}

// =============================================================================
// TrafficShifted -> Committed
// =============================================================================

impl Rollout<TrafficShifted> {
    /// Persist the flipped environment state.
    ///
    /// # Errors
    ///
    /// A persist failure here is critical: the deployment is live and
    /// serving, so traffic is NOT reverted. The error is surfaced loudly
    /// and the state file is left stale.
    #[must_use = "rollout state must be used"]
    pub fn commit_state(mut self) -> Result<Rollout<Committed>, DeployError> {
        self.state
            .env_mut(self.env)
            .record_rollout(self.slot, &self.commit);

        if let Err(e) = config::save_state(&self.base, self.project.as_str(), &self.state) {
            tracing::error!(
                "CRITICAL: {} rollout of {} is live, but saving state failed: {}",
                self.env,
                self.commit.short(),
                e
            );
            return Err(DeployError::StatePersistFailed(e));
        }

        Ok(self.transition())
    }
}

// =============================================================================
// Shared rollback
// =============================================================================

/// Stop and remove the container created by this rollout attempt.
///
/// The previous container, proxy config, state file, and built image are all
/// left untouched; the image remains as input for a retry or a later approve.
/// Runs on a fresh token so a cancelled workflow still cleans up.
async fn rollback_new_container<S>(
    rollout: Rollout<S>,
    docker: &RuntimeClient,
) -> Result<(), DeployError> {
    let Some(id) = rollout.new_container() else {
        return Ok(());
    };

    tracing::warn!(
        "rolling back: stopping and removing newly started container {}",
        id.short()
    );

    let cleanup_token = CancellationToken::new();
    let _ = docker
        .stop_container(&cleanup_token, id, Some(STOP_TIMEOUT))
        .await;
    docker.remove_container(&cleanup_token, id).await?;

    tracing::info!("rollback cleanup: removed container {}", id.short());
    Ok(())
}
