// ABOUTME: Container lifecycle operations: run, stop, start, remove, inspect, list, exec, logs.
// ABOUTME: Label-based lookups are the authoritative index for managed containers.

use super::error::{
    map_container_create_error, map_container_not_found_error, map_container_start_error,
    map_container_stop_error, map_exec_create_error, map_exec_not_found_error, ContainerError,
    ExecError,
};
use super::{with_cancel, RuntimeClient};
use crate::types::{ContainerId, ExecId};
use bollard::models::{
    ContainerCreateBody, EndpointSettings, HostConfig, Mount, MountTypeEnum, NetworkingConfig,
    PortBinding, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    CreateContainerOptions, InspectContainerOptions, KillContainerOptions, ListContainersOptions,
    LogsOptions, RemoveContainerOptions, RestartContainerOptions, StopContainerOptions,
};
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const LABEL_MANAGED: &str = "reflow.managed";
pub const LABEL_PROJECT: &str = "reflow.project";
pub const LABEL_ENVIRONMENT: &str = "reflow.environment";
pub const LABEL_SLOT: &str = "reflow.slot";
pub const LABEL_COMMIT: &str = "reflow.commit";

/// Parameters for creating and starting a container.
///
/// Application containers expose their app port on the shared network;
/// the proxy container additionally publishes host ports and bind-mounts
/// its config and log directories.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub image: String,
    pub name: String,
    pub network: String,
    pub labels: HashMap<String, String>,
    pub env: Vec<String>,
    pub app_port: u16,
    pub restart_policy: RestartPolicyNameEnum,
    pub publish_ports: Vec<PublishedPort>,
    pub binds: Vec<BindMount>,
}

/// A container port published on the host.
#[derive(Debug, Clone, Copy)]
pub struct PublishedPort {
    pub container_port: u16,
    pub host_port: u16,
}

/// A host directory bind-mounted into the container.
#[derive(Debug, Clone)]
pub struct BindMount {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

/// Summary information about a container, from list operations.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
    pub labels: HashMap<String, String>,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }

    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Detailed information about a single container.
#[derive(Debug, Clone)]
pub struct ContainerInspect {
    pub id: ContainerId,
    pub name: String,
    pub running: bool,
    pub state: String,
    pub labels: HashMap<String, String>,
}

/// Completion status of an exec instance.
#[derive(Debug, Clone, Copy)]
pub struct ExecStatus {
    pub running: bool,
    pub exit_code: Option<i64>,
}

impl RuntimeClient {
    /// Find containers matching the given labels. Always scoped to managed
    /// containers and includes stopped ones.
    pub async fn find_containers_by_labels(
        &self,
        cancel: &CancellationToken,
        labels: &[(&str, &str)],
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut label_filters: Vec<String> = labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        label_filters.push(format!("{LABEL_MANAGED}=true"));

        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("label".to_string(), label_filters);

        let opts = ListContainersOptions {
            all: true,
            filters: Some(filters),
            ..Default::default()
        };

        let containers = with_cancel(cancel, async {
            self.client
                .list_containers(Some(opts))
                .await
                .map_err(|e| ContainerError::Runtime(e.to_string()))
        })
        .await?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let names = c.names.unwrap_or_default();
                let name = names
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();

                ContainerSummary {
                    id: ContainerId::new(c.id.unwrap_or_default()),
                    name,
                    image: c.image.unwrap_or_default(),
                    state: c
                        .state
                        .map(|s| format!("{s:?}").to_lowercase())
                        .unwrap_or_default(),
                    status: c.status.unwrap_or_default(),
                    labels: c.labels.unwrap_or_default(),
                }
            })
            .collect())
    }

    /// List every container this tool manages, running or not.
    pub async fn list_managed_containers(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        self.find_containers_by_labels(cancel, &[]).await
    }

    /// Create and start a container from the given spec.
    ///
    /// A start failure removes the half-created container before returning.
    pub async fn run_container(
        &self,
        cancel: &CancellationToken,
        spec: &RunSpec,
    ) -> Result<ContainerId, ContainerError> {
        let mut exposed = HashMap::new();
        exposed.insert(format!("{}/tcp", spec.app_port), HashMap::new());

        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        for publish in &spec.publish_ports {
            let key = format!("{}/tcp", publish.container_port);
            exposed.insert(key.clone(), HashMap::new());
            port_bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(publish.host_port.to_string()),
                }]),
            );
        }

        let mounts: Vec<Mount> = spec
            .binds
            .iter()
            .map(|b| Mount {
                source: Some(b.source.clone()),
                target: Some(b.target.clone()),
                typ: Some(MountTypeEnum::BIND),
                read_only: Some(b.read_only),
                ..Default::default()
            })
            .collect();

        let mut endpoints: HashMap<String, EndpointSettings> = HashMap::new();
        endpoints.insert(spec.network.clone(), EndpointSettings::default());

        let body = ContainerCreateBody {
            image: Some(spec.image.clone()),
            labels: Some(spec.labels.clone()),
            env: Some(spec.env.clone()),
            exposed_ports: Some(exposed),
            host_config: Some(HostConfig {
                restart_policy: Some(RestartPolicy {
                    name: Some(spec.restart_policy),
                    maximum_retry_count: None,
                }),
                port_bindings: if port_bindings.is_empty() {
                    None
                } else {
                    Some(port_bindings)
                },
                mounts: if mounts.is_empty() { None } else { Some(mounts) },
                ..Default::default()
            }),
            networking_config: Some(NetworkingConfig {
                endpoints_config: Some(endpoints),
            }),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(spec.name.clone()),
            ..Default::default()
        };

        tracing::debug!("creating container '{}'", spec.name);
        let response = with_cancel(cancel, async {
            self.client
                .create_container(Some(opts), body)
                .await
                .map_err(map_container_create_error)
        })
        .await?;
        let id = ContainerId::new(response.id);

        tracing::debug!("starting container '{}' ({})", spec.name, id.short());
        let started = with_cancel(cancel, async {
            self.client
                .start_container(
                    id.as_str(),
                    None::<bollard::query_parameters::StartContainerOptions>,
                )
                .await
                .map_err(map_container_start_error)
        })
        .await;

        if let Err(e) = started {
            // Don't leave the half-created container behind.
            let _ = self
                .client
                .remove_container(
                    id.as_str(),
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await;
            return Err(ContainerError::StartFailed(e.to_string()));
        }

        Ok(id)
    }

    /// Stop a container. An already-stopped container is not an error.
    pub async fn stop_container(
        &self,
        cancel: &CancellationToken,
        id: &ContainerId,
        timeout: Option<Duration>,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: timeout.map(|t| t.as_secs() as i32),
            signal: None,
        };

        let result = with_cancel(cancel, async {
            self.client
                .stop_container(id.as_str(), Some(opts))
                .await
                .map_err(map_container_stop_error)
        })
        .await;

        match result {
            Err(ContainerError::NotRunning(_)) => {
                tracing::debug!("container {} was already stopped", id.short());
                Ok(())
            }
            other => other,
        }
    }

    /// Start a container. An already-running container is not an error.
    pub async fn start_container(
        &self,
        cancel: &CancellationToken,
        id: &ContainerId,
    ) -> Result<(), ContainerError> {
        let result = with_cancel(cancel, async {
            self.client
                .start_container(
                    id.as_str(),
                    None::<bollard::query_parameters::StartContainerOptions>,
                )
                .await
                .map_err(map_container_start_error)
        })
        .await;

        match result {
            Err(ContainerError::AlreadyRunning(_)) => {
                tracing::debug!("container {} was already running", id.short());
                Ok(())
            }
            other => other,
        }
    }

    pub async fn restart_container(
        &self,
        cancel: &CancellationToken,
        id: &ContainerId,
        timeout: Option<Duration>,
    ) -> Result<(), ContainerError> {
        let opts = RestartContainerOptions {
            t: Some(timeout.map(|t| t.as_secs() as i32).unwrap_or(10)),
            ..Default::default()
        };

        with_cancel(cancel, async {
            self.client
                .restart_container(id.as_str(), Some(opts))
                .await
                .map_err(map_container_not_found_error)
        })
        .await
    }

    /// Remove a stopped container. A missing container is not an error.
    pub async fn remove_container(
        &self,
        cancel: &CancellationToken,
        id: &ContainerId,
    ) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force: false,
            ..Default::default()
        };

        let result = with_cancel(cancel, async {
            self.client
                .remove_container(id.as_str(), Some(opts))
                .await
                .map_err(map_container_not_found_error)
        })
        .await;

        match result {
            Err(ContainerError::NotFound(_)) => {
                tracing::debug!("container {} already gone", id.short());
                Ok(())
            }
            other => other,
        }
    }

    /// Inspect by id or name.
    pub async fn inspect_container(
        &self,
        cancel: &CancellationToken,
        name_or_id: &str,
    ) -> Result<ContainerInspect, ContainerError> {
        let details = with_cancel(cancel, async {
            self.client
                .inspect_container(name_or_id, None::<InspectContainerOptions>)
                .await
                .map_err(map_container_not_found_error)
        })
        .await?;

        let state = details.state.as_ref();
        Ok(ContainerInspect {
            id: ContainerId::new(details.id.clone().unwrap_or_default()),
            name: details
                .name
                .clone()
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            running: state.and_then(|s| s.running).unwrap_or(false),
            state: state
                .and_then(|s| s.status)
                .map(|s| format!("{s:?}").to_lowercase())
                .unwrap_or_default(),
            labels: details
                .config
                .and_then(|c| c.labels)
                .unwrap_or_default(),
        })
    }

    /// Send a signal to a container by name.
    pub async fn kill_container(
        &self,
        cancel: &CancellationToken,
        name_or_id: &str,
        signal: &str,
    ) -> Result<(), ContainerError> {
        let opts = KillContainerOptions {
            signal: signal.to_string(),
            ..Default::default()
        };

        with_cancel(cancel, async {
            self.client
                .kill_container(name_or_id, Some(opts))
                .await
                .map_err(map_container_not_found_error)
        })
        .await
    }

    /// Stream container log lines.
    pub fn container_logs(
        &self,
        id: &ContainerId,
        follow: bool,
        tail: Option<u64>,
    ) -> Pin<Box<dyn Stream<Item = Result<String, ContainerError>> + Send>> {
        let opts = LogsOptions {
            stdout: true,
            stderr: true,
            follow,
            timestamps: true,
            tail: tail.map(|n| n.to_string()).unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };

        let stream = self.client.logs(id.as_str(), Some(opts)).map(|result| {
            result
                .map(|output| String::from_utf8_lossy(&output.into_bytes()).into_owned())
                .map_err(|e| ContainerError::Runtime(e.to_string()))
        });

        Box::pin(stream)
    }

    // -----------------------------------------------------------------------
    // Exec
    // -----------------------------------------------------------------------

    pub async fn exec_create(
        &self,
        cancel: &CancellationToken,
        container: &str,
        cmd: Vec<String>,
    ) -> Result<ExecId, ExecError> {
        let config = bollard::models::ExecConfig {
            cmd: Some(cmd),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let response = with_cancel(cancel, async {
            self.client
                .create_exec(container, config)
                .await
                .map_err(map_exec_create_error)
        })
        .await?;

        Ok(ExecId::new(response.id))
    }

    /// Start an exec and drain its output; completion is observed via
    /// `exec_inspect`, not via the stream ending.
    pub async fn exec_start_and_drain(
        &self,
        cancel: &CancellationToken,
        exec_id: &ExecId,
    ) -> Result<(), ExecError> {
        let result = with_cancel(cancel, async {
            self.client
                .start_exec(exec_id.as_str(), None)
                .await
                .map_err(map_exec_not_found_error)
        })
        .await?;

        if let bollard::exec::StartExecResults::Attached { mut output, .. } = result {
            let drain = async {
                while let Some(item) = output.next().await {
                    match item {
                        Ok(chunk) => {
                            tracing::trace!("exec output: {}", String::from_utf8_lossy(
                                &chunk.into_bytes()
                            ));
                        }
                        Err(e) => return Err(ExecError::Failed(e.to_string())),
                    }
                }
                Ok(())
            };
            with_cancel(cancel, drain).await?;
        }

        Ok(())
    }

    pub async fn exec_inspect(
        &self,
        cancel: &CancellationToken,
        exec_id: &ExecId,
    ) -> Result<ExecStatus, ExecError> {
        let details = with_cancel(cancel, async {
            self.client
                .inspect_exec(exec_id.as_str())
                .await
                .map_err(map_exec_not_found_error)
        })
        .await?;

        Ok(ExecStatus {
            running: details.running.unwrap_or(false),
            exit_code: details.exit_code,
        })
    }
}
