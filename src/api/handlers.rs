// ABOUTME: Control plane request handlers.
// ABOUTME: Thin JSON adapters over the project manager and orchestrator workflows.

use super::error::ApiError;
use super::ApiState;
use crate::audit::{self, HistoryQuery, Outcome};
use crate::orchestrator;
use crate::project;
use crate::types::{ContainerId, Environment, ProjectName};
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn parse_project(name: &str) -> Result<ProjectName, ApiError> {
    ProjectName::new(name).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn parse_env(env: &str) -> Result<Environment, ApiError> {
    env.parse()
        .map_err(|e: crate::types::ParseEnvironmentError| ApiError::bad_request(e.to_string()))
}

pub async fn not_found(uri: OriginalUri) -> ApiError {
    ApiError::not_found(format!("not found: {}", uri.0.path()))
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub async fn list_projects(
    State(state): State<ApiState>,
) -> Result<Json<Vec<project::ProjectSummary>>, ApiError> {
    let summaries = project::list(&state.base)?;
    Ok(Json(summaries))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(rename = "repoURL", alias = "repoUrl")]
    pub repo_url: String,
    #[serde(default)]
    pub staging_domain: Option<String>,
    #[serde(default)]
    pub production_domain: Option<String>,
}

pub async fn create_project(
    State(state): State<ApiState>,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let name = parse_project(&request.name)?;
    if request.repo_url.is_empty() {
        return Err(ApiError::bad_request("repoURL is required"));
    }

    let cancel = CancellationToken::new();
    project::create(
        &state.base,
        &name,
        &request.repo_url,
        request.staging_domain,
        request.production_domain,
        &cancel,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "name": name.to_string() }))))
}

pub async fn project_status(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<project::ProjectDetails>, ApiError> {
    let name = parse_project(&name)?;
    let cancel = CancellationToken::new();
    let details = project::status(&state.docker, &state.base, &name, &cancel).await?;
    Ok(Json(details))
}

// ---------------------------------------------------------------------------
// Rollouts
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct DeployRequest {
    #[serde(default)]
    pub revision: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutResponse {
    pub commit: String,
    pub slot: String,
    pub container_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl From<orchestrator::RolloutOutcome> for RolloutResponse {
    fn from(outcome: orchestrator::RolloutOutcome) -> Self {
        Self {
            commit: outcome.commit.to_string(),
            slot: outcome.slot.to_string(),
            container_name: outcome.container_name,
            domain: outcome.domain,
        }
    }
}

pub async fn deploy(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    request: Option<Json<DeployRequest>>,
) -> Result<Json<RolloutResponse>, ApiError> {
    let name = parse_project(&name)?;

    let Some(_ticket) = state.begin_rollout(name.as_str()) else {
        return Err(ApiError::conflict(format!(
            "a deployment for '{name}' is already in progress"
        )));
    };

    let revision = request.and_then(|Json(r)| r.revision);
    let cancel = CancellationToken::new();
    let outcome = orchestrator::deploy(
        &state.docker,
        &state.base,
        &name,
        revision.as_deref(),
        "api",
        &cancel,
    )
    .await?;

    Ok(Json(outcome.into()))
}

pub async fn approve(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<RolloutResponse>, ApiError> {
    let name = parse_project(&name)?;

    let Some(_ticket) = state.begin_rollout(name.as_str()) else {
        return Err(ApiError::conflict(format!(
            "a deployment for '{name}' is already in progress"
        )));
    };

    let cancel = CancellationToken::new();
    let outcome =
        orchestrator::approve(&state.docker, &state.base, &name, "api", &cancel).await?;

    Ok(Json(outcome.into()))
}

// ---------------------------------------------------------------------------
// Environment lifecycle
// ---------------------------------------------------------------------------

pub async fn start_env(
    State(state): State<ApiState>,
    Path((name, env)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = parse_project(&name)?;
    let env = parse_env(&env)?;
    let cancel = CancellationToken::new();

    let started =
        orchestrator::start_project_env(&state.docker, &state.base, &name, env, &cancel).await?;
    Ok(Json(json!({ "started": started })))
}

pub async fn stop_env(
    State(state): State<ApiState>,
    Path((name, env)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = parse_project(&name)?;
    let env = parse_env(&env)?;
    let cancel = CancellationToken::new();

    let stopped =
        orchestrator::stop_project_env(&state.docker, &state.base, &name, env, &cancel).await?;
    Ok(Json(json!({ "stopped": stopped })))
}

// ---------------------------------------------------------------------------
// Config and env files
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
}

pub async fn get_project_config(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<FileContent>, ApiError> {
    let name = parse_project(&name)?;
    let path = crate::config::project_base_path(&state.base, name.as_str())
        .join(crate::config::PROJECT_CONFIG_FILE);

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(Json(FileContent { content })),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::not_found(format!(
            "project '{name}' config not found"
        ))),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}

pub async fn put_project_config(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(body): Json<FileContent>,
) -> Result<StatusCode, ApiError> {
    let name = parse_project(&name)?;
    let path = crate::config::project_base_path(&state.base, name.as_str())
        .join(crate::config::PROJECT_CONFIG_FILE);
    if !path.exists() {
        return Err(ApiError::not_found(format!(
            "project '{name}' config not found"
        )));
    }

    // Reject configs that would fail at the next deploy.
    serde_yaml::from_str::<crate::config::ProjectConfig>(&body.content)
        .map_err(|e| ApiError::bad_request(format!("invalid project config: {e}")))?;

    crate::config::write_atomic(&path, body.content.as_bytes())
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

fn env_file_path(
    state: &ApiState,
    name: &ProjectName,
    env: Environment,
) -> Result<std::path::PathBuf, ApiError> {
    let cfg = crate::config::load_project(&state.base, name.as_str())?;
    let Some(env_file) = cfg.environment(env).and_then(|e| e.env_file.clone()) else {
        return Err(ApiError::not_found(format!(
            "no env file configured for '{name}'/{env}"
        )));
    };
    Ok(crate::config::repo_path(&state.base, name.as_str()).join(env_file))
}

pub async fn get_env_file(
    State(state): State<ApiState>,
    Path((name, env)): Path<(String, String)>,
) -> Result<Json<FileContent>, ApiError> {
    let name = parse_project(&name)?;
    let env = parse_env(&env)?;
    let path = env_file_path(&state, &name, env)?;

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(Json(FileContent { content })),
        // A configured but not-yet-written env file reads as empty.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(Json(FileContent {
                content: String::new(),
            }))
        }
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}

pub async fn put_env_file(
    State(state): State<ApiState>,
    Path((name, env)): Path<(String, String)>,
    Json(body): Json<FileContent>,
) -> Result<StatusCode, ApiError> {
    let name = parse_project(&name)?;
    let env = parse_env(&env)?;
    let path = env_file_path(&state, &name, env)?;

    crate::config::write_atomic(&path, body.content.as_bytes())
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsParams {
    #[serde(default)]
    pub tail: Option<u64>,
}

pub async fn env_logs(
    State(state): State<ApiState>,
    Path((name, env)): Path<(String, String)>,
    Query(params): Query<LogsParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    use crate::runtime::{LABEL_ENVIRONMENT, LABEL_PROJECT, LABEL_SLOT};
    use futures::StreamExt;

    let name = parse_project(&name)?;
    let env = parse_env(&env)?;
    let cancel = CancellationToken::new();

    let project_state = crate::config::load_state(&state.base, name.as_str())?;
    let env_state = project_state.env(env);
    if !env_state.is_deployed() {
        return Err(ApiError::not_found(format!(
            "no active deployment for '{name}'/{env}"
        )));
    }

    let project_str = name.to_string();
    let env_str = env.to_string();
    let containers = state
        .docker
        .find_containers_by_labels(
            &cancel,
            &[
                (LABEL_PROJECT, &project_str),
                (LABEL_ENVIRONMENT, &env_str),
                (LABEL_SLOT, &env_state.active_slot),
            ],
        )
        .await?;

    let Some(container) = containers.first() else {
        return Err(ApiError::not_found(format!(
            "no container found for '{name}'/{env}"
        )));
    };

    let mut stream =
        state
            .docker
            .container_logs(&container.id, false, Some(params.tail.unwrap_or(100)));
    let mut lines = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(text) => lines.push(text),
            Err(e) => return Err(ApiError::internal(e.to_string())),
        }
    }

    Ok(Json(json!({
        "container": container.name,
        "lines": lines,
    })))
}

// ---------------------------------------------------------------------------
// History and cleanup
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

pub async fn deployment_history(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<audit::DeploymentEvent>>, ApiError> {
    let name = parse_project(&name)?;

    let environment = params.env.as_deref().map(parse_env).transpose()?;
    let outcome = match params.outcome.as_deref() {
        None => None,
        Some("started") => Some(Outcome::Started),
        Some("success") => Some(Outcome::Success),
        Some("failure") => Some(Outcome::Failure),
        Some(other) => {
            return Err(ApiError::bad_request(format!("invalid outcome: '{other}'")));
        }
    };

    let query = HistoryQuery {
        environment,
        outcome,
        limit: params.limit,
        offset: params.offset,
    };

    let events = audit::history(&state.base, name.as_str(), &query)
        .map_err(|e| ApiError::internal(format!("failed to read deployment history: {e}")))?;
    Ok(Json(events))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupParams {
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub prune_images: Option<bool>,
}

pub async fn cleanup(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(params): Query<CleanupParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = parse_project(&name)?;
    let envs = match params.env.as_deref() {
        None | Some("all") => Environment::ALL.to_vec(),
        Some(env) => vec![parse_env(env)?],
    };

    let cancel = CancellationToken::new();
    let result = orchestrator::cleanup(
        &state.docker,
        &state.base,
        &name,
        &envs,
        params.prune_images.unwrap_or(false),
        &cancel,
    )
    .await;

    match result {
        Ok(report) => Ok(Json(json!({
            "containersRemoved": report.containers_removed,
            "imagesRemoved": report.images_removed,
        }))),
        Err((report, e)) => Err(ApiError::internal(e.to_string()).with_details(format!(
            "removed {} container(s), {} image(s) before failing",
            report.containers_removed, report.images_removed
        ))),
    }
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResponse {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
    pub labels: std::collections::HashMap<String, String>,
}

pub async fn list_containers(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ContainerResponse>>, ApiError> {
    let cancel = CancellationToken::new();
    let containers = state.docker.list_managed_containers(&cancel).await?;

    Ok(Json(
        containers
            .into_iter()
            .map(|c| ContainerResponse {
                id: c.id.into_inner(),
                name: c.name,
                image: c.image,
                state: c.state,
                status: c.status,
                labels: c.labels,
            })
            .collect(),
    ))
}

pub async fn inspect_container(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cancel = CancellationToken::new();
    let details = state.docker.inspect_container(&cancel, &id).await?;

    Ok(Json(json!({
        "id": details.id.as_str(),
        "name": details.name,
        "running": details.running,
        "state": details.state,
        "labels": details.labels,
    })))
}

pub async fn start_container(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cancel = CancellationToken::new();
    state
        .docker
        .start_container(&cancel, &ContainerId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stop_container(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cancel = CancellationToken::new();
    state
        .docker
        .stop_container(&cancel, &ContainerId::new(id), Some(Duration::from_secs(10)))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restart_container(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cancel = CancellationToken::new();
    state
        .docker
        .restart_container(&cancel, &ContainerId::new(id), None)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_container(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cancel = CancellationToken::new();
    let id = ContainerId::new(id);
    let _ = state
        .docker
        .stop_container(&cancel, &id, Some(Duration::from_secs(10)))
        .await;
    state.docker.remove_container(&cancel, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
