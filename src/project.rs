// ABOUTME: Project management: create, list, and detailed status.
// ABOUTME: Status merges the filesystem state with live container inspection by labels.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::config::{self, ProjectEnvConfig};
use crate::git::{self, GitError};
use crate::orchestrator::DeployError;
use crate::runtime::{RuntimeClient, LABEL_ENVIRONMENT, LABEL_PROJECT, LABEL_SLOT};
use crate::types::{Environment, ProjectName};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project '{0}' already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of `project list`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub repo_url: String,
    pub staging_status: String,
    pub production_status: String,
}

/// Per-environment block of `project status`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EnvironmentDetails {
    pub environment: String,
    pub is_active: bool,
    pub active_commit: String,
    pub active_slot: String,
    pub slot_color: String,
    pub effective_domain: Option<String>,
    pub app_port: u16,
    pub container_status: String,
    pub container_name: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProjectDetails {
    pub name: String,
    pub repo_url: String,
    pub staging: EnvironmentDetails,
    pub production: EnvironmentDetails,
}

/// Create a project: directory, clone, default config, empty state.
///
/// A clone failure removes the half-created project directory.
pub async fn create(
    base: &Path,
    name: &ProjectName,
    repo_url: &str,
    staging_domain: Option<String>,
    production_domain: Option<String>,
    cancel: &CancellationToken,
) -> Result<(), ProjectError> {
    let project_path = config::project_base_path(base, name.as_str());
    if project_path.exists() {
        return Err(ProjectError::AlreadyExists(name.to_string()));
    }

    std::fs::create_dir_all(&project_path)?;
    tracing::info!("creating project '{name}' from '{repo_url}'");

    let repo_dest = config::repo_path(base, name.as_str());
    if let Err(e) = git::clone(cancel, repo_url, &repo_dest).await {
        tracing::warn!("cleaning up project directory after clone failure");
        let _ = std::fs::remove_dir_all(&project_path);
        return Err(e.into());
    }

    let mut environments = std::collections::BTreeMap::new();
    environments.insert(
        Environment::Staging.state_key().to_string(),
        ProjectEnvConfig {
            domain: staging_domain,
            env_file: Some(".env.development".to_string()),
        },
    );
    environments.insert(
        Environment::Production.state_key().to_string(),
        ProjectEnvConfig {
            domain: production_domain,
            env_file: Some(".env.production".to_string()),
        },
    );

    let proj_cfg = config::ProjectConfig {
        project_name: name.to_string(),
        source_repo_url: repo_url.to_string(),
        app_port: 3000,
        runtime_version: "18-alpine".to_string(),
        environments,
    };
    config::save_project(base, &proj_cfg)?;
    config::save_state(base, name.as_str(), &config::ProjectState::default())?;

    tracing::info!("project '{name}' created");
    Ok(())
}

/// Scan the apps directory and summarize every valid project.
pub fn list(base: &Path) -> Result<Vec<ProjectSummary>, ProjectError> {
    let apps = base.join(config::APPS_DIR);
    let entries = match std::fs::read_dir(&apps) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut summaries = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();

        let proj_cfg = match config::load_project(base, &name) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("skipping project '{name}': failed to load config: {e}");
                continue;
            }
        };
        let state = config::load_state(base, &name).unwrap_or_default();

        summaries.push(ProjectSummary {
            name: proj_cfg.project_name,
            repo_url: proj_cfg.source_repo_url,
            staging_status: env_status_line(state.env(Environment::Staging)),
            production_status: env_status_line(state.env(Environment::Production)),
        });
    }

    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(summaries)
}

fn env_status_line(state: &config::EnvironmentState) -> String {
    match state.active_commit() {
        Some(commit) => {
            let color = state
                .active_slot()
                .map(|s| s.color())
                .unwrap_or("unknown");
            format!("Commit: {} ({color})", commit.short())
        }
        None => "Not deployed".to_string(),
    }
}

/// Gather detailed status for a project, including live container state.
pub async fn status(
    docker: &RuntimeClient,
    base: &Path,
    name: &ProjectName,
    cancel: &CancellationToken,
) -> Result<ProjectDetails, DeployError> {
    let proj_cfg = config::load_project(base, name.as_str())?;
    let state = config::load_state(base, name.as_str())?;
    let global = config::load_global(base)?;

    let mut details = Vec::new();
    for env in Environment::ALL {
        let env_state = state.env(env);
        let effective_domain = config::effective_domain(&global, &proj_cfg, env).ok();

        let (container_status, container_name) = if env_state.is_deployed() {
            let project_str = name.to_string();
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
            match containers.first() {
                Some(c) if c.is_running() => (format!("Running ({})", c.status), c.name.clone()),
                Some(c) => (c.status.clone(), c.name.clone()),
                None => ("Not found".to_string(), String::new()),
            }
        } else {
            ("Not deployed".to_string(), String::new())
        };

        details.push(EnvironmentDetails {
            environment: env.to_string(),
            is_active: env_state.is_deployed(),
            active_commit: env_state.active_commit.clone(),
            active_slot: env_state.active_slot.clone(),
            slot_color: env_state
                .active_slot()
                .map(|s| s.color().to_string())
                .unwrap_or_default(),
            effective_domain,
            app_port: proj_cfg.app_port,
            container_status,
            container_name,
        });
    }

    let production = details.pop().expect("two environments");
    let staging = details.pop().expect("two environments");

    Ok(ProjectDetails {
        name: proj_cfg.project_name,
        repo_url: proj_cfg.source_repo_url,
        staging,
        production,
    })
}
