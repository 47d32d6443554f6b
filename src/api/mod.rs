// ABOUTME: HTTP control plane: JSON over /api/v1, mirroring the CLI workflows.
// ABOUTME: One deployment per project at a time, enforced by an in-process guard.

mod error;
mod handlers;

pub use error::{ApiError, ErrorBody};

use crate::runtime::RuntimeClient;
use axum::routing::{delete, get, post};
use axum::Router;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state for the control plane.
#[derive(Clone)]
pub struct ApiState {
    pub base: PathBuf,
    pub docker: RuntimeClient,
    /// Projects with a rollout in flight. The control plane must not launch
    /// a second deployment for a project already deploying.
    deploying: Arc<Mutex<HashSet<String>>>,
}

impl ApiState {
    pub fn new(base: PathBuf, docker: RuntimeClient) -> Self {
        Self {
            base,
            docker,
            deploying: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Mark a project as deploying; `None` if it already is.
    fn begin_rollout(&self, project: &str) -> Option<RolloutTicket> {
        let mut deploying = self.deploying.lock();
        if !deploying.insert(project.to_string()) {
            return None;
        }
        Some(RolloutTicket {
            project: project.to_string(),
            deploying: Arc::clone(&self.deploying),
        })
    }
}

/// Releases the per-project rollout slot on drop, error paths included.
struct RolloutTicket {
    project: String,
    deploying: Arc<Mutex<HashSet<String>>>,
}

impl Drop for RolloutTicket {
    fn drop(&mut self) {
        self.deploying.lock().remove(&self.project);
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/projects", get(handlers::list_projects))
        .route("/api/v1/projects", post(handlers::create_project))
        .route("/api/v1/projects/{name}", get(handlers::project_status))
        .route("/api/v1/projects/{name}/deploy", post(handlers::deploy))
        .route("/api/v1/projects/{name}/approve", post(handlers::approve))
        .route(
            "/api/v1/projects/{name}/environments/{env}/start",
            post(handlers::start_env),
        )
        .route(
            "/api/v1/projects/{name}/environments/{env}/stop",
            post(handlers::stop_env),
        )
        .route(
            "/api/v1/projects/{name}/config",
            get(handlers::get_project_config).put(handlers::put_project_config),
        )
        .route(
            "/api/v1/projects/{name}/environments/{env}/envfile",
            get(handlers::get_env_file).put(handlers::put_env_file),
        )
        .route(
            "/api/v1/projects/{name}/environments/{env}/logs",
            get(handlers::env_logs),
        )
        .route(
            "/api/v1/projects/{name}/deployments",
            get(handlers::deployment_history),
        )
        .route("/api/v1/projects/{name}/cleanup", post(handlers::cleanup))
        .route("/api/v1/containers", get(handlers::list_containers))
        .route("/api/v1/containers/{id}", get(handlers::inspect_container))
        .route("/api/v1/containers/{id}", delete(handlers::remove_container))
        .route(
            "/api/v1/containers/{id}/start",
            post(handlers::start_container),
        )
        .route(
            "/api/v1/containers/{id}/stop",
            post(handlers::stop_container),
        )
        .route(
            "/api/v1/containers/{id}/restart",
            post(handlers::restart_container),
        )
        .fallback(handlers::not_found)
        .with_state(state)
}

/// Bind and serve the control plane until the process exits.
pub async fn serve(
    base: PathBuf,
    docker: RuntimeClient,
    host: &str,
    port: u16,
) -> std::io::Result<()> {
    let state = ApiState::new(base, docker);
    let app = router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("control plane listening on http://{addr}");

    axum::serve(listener, app).await
}
