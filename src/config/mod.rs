// ABOUTME: Global and per-project configuration: YAML files under the base directory.
// ABOUTME: Whole-file reads and writes only; the global config is cached in-process.

mod env_file;
mod state;

pub use env_file::load_env_file;
pub use state::{load_state, save_state, EnvironmentState, ProjectState};

use crate::types::Environment;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const NETWORK_NAME: &str = "reflow-network";
pub const PROXY_CONTAINER_NAME: &str = "reflow-nginx";
pub const PROXY_IMAGE: &str = "nginx:stable-alpine";

pub const GLOBAL_CONFIG_FILE: &str = "config.yaml";
pub const PROJECT_CONFIG_FILE: &str = "config.yaml";
pub const PROJECT_STATE_FILE: &str = "state.json";
pub const DEPLOYMENTS_LOG_FILE: &str = "deployments.log";
pub const APPS_DIR: &str = "apps";
pub const PROXY_DIR: &str = "proxy";
pub const PROXY_CONF_DIR: &str = "conf.d";
pub const PROXY_LOG_DIR: &str = "logs";
pub const REPO_DIR: &str = "repo";
pub const INTERNAL_STATE_DIR: &str = ".reflow-state";

/// The placeholder domain written by `init`; a reminder, not a usable value.
const DEFAULT_DOMAIN_PLACEHOLDER: &str = "yourdomain.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("project '{0}' config not found (run 'reflow project create'?)")]
    ProjectNotFound(String),

    #[error("invalid configuration in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid state file {path}: {source}")]
    InvalidState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "cannot determine domain for {project}/{env}: no domain configured and \
         global defaultDomain is not set"
    )]
    DomainUnresolved { project: String, env: Environment },

    #[error("environment '{env}' not defined in project config for '{project}'")]
    EnvironmentUndefined { project: String, env: Environment },

    #[error("failed to persist state to {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Global configuration stored at `$BASE/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default = "default_domain_fallback")]
    pub default_domain: String,
    #[serde(default)]
    pub debug: bool,
}

/// Absent config or absent key falls back to localhost so a fresh host can
/// deploy before DNS exists. Discouraged for anything reachable.
fn default_domain_fallback() -> String {
    "localhost".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_domain: default_domain_fallback(),
            debug: false,
        }
    }
}

impl GlobalConfig {
    /// The config `init` writes when none exists yet.
    pub fn initial() -> Self {
        Self {
            default_domain: DEFAULT_DOMAIN_PLACEHOLDER.to_string(),
            debug: false,
        }
    }
}

/// Per-environment settings within a project config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEnvConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
}

/// Project configuration stored at `$BASE/apps/<project>/config.yaml`.
///
/// Created by `project create`, edited by the user, never mutated by the
/// deployment workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub project_name: String,

    #[serde(rename = "sourceRepoURL")]
    pub source_repo_url: String,

    #[serde(default = "default_app_port")]
    pub app_port: u16,

    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,

    /// Keyed by the on-disk environment names (`test`/`prod`).
    #[serde(default)]
    pub environments: BTreeMap<String, ProjectEnvConfig>,
}

fn default_app_port() -> u16 {
    3000
}

fn default_runtime_version() -> String {
    "18-alpine".to_string()
}

impl ProjectConfig {
    pub fn environment(&self, env: Environment) -> Option<&ProjectEnvConfig> {
        self.environments.get(env.state_key())
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

pub fn project_base_path(base: &Path, project: &str) -> PathBuf {
    base.join(APPS_DIR).join(project)
}

pub fn repo_path(base: &Path, project: &str) -> PathBuf {
    project_base_path(base, project).join(REPO_DIR)
}

pub fn proxy_conf_dir(base: &Path) -> PathBuf {
    base.join(PROXY_DIR).join(PROXY_CONF_DIR)
}

pub fn proxy_log_dir(base: &Path) -> PathBuf {
    base.join(PROXY_DIR).join(PROXY_LOG_DIR)
}

pub fn deployments_log_path(base: &Path, project: &str) -> PathBuf {
    project_base_path(base, project).join(DEPLOYMENTS_LOG_FILE)
}

// ---------------------------------------------------------------------------
// Atomic whole-file writes
// ---------------------------------------------------------------------------

/// Write `data` to `path` via a temp file and rename.
///
/// Single-writer-per-project is guaranteed by the callers, so the rename only
/// has to protect readers from torn files.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("config");
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)
}

// ---------------------------------------------------------------------------
// Global config (cached)
// ---------------------------------------------------------------------------

static GLOBAL_CACHE: RwLock<Option<GlobalConfig>> = RwLock::new(None);

/// Load the global config, falling back to defaults when the file is absent.
///
/// The result is cached for the life of the process; `save_global` refreshes
/// the cache. One process manages one base directory.
pub fn load_global(base: &Path) -> Result<GlobalConfig, ConfigError> {
    if let Some(cached) = GLOBAL_CACHE.read().as_ref() {
        return Ok(cached.clone());
    }

    let path = base.join(GLOBAL_CONFIG_FILE);
    let config = match std::fs::read_to_string(&path) {
        Ok(content) => {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Invalid {
                path: path.clone(),
                source,
            })?
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("global config not found at {}, using defaults", path.display());
            GlobalConfig::default()
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    *GLOBAL_CACHE.write() = Some(config.clone());
    Ok(config)
}

pub fn save_global(base: &Path, config: &GlobalConfig) -> Result<(), ConfigError> {
    let path = base.join(GLOBAL_CONFIG_FILE);
    let data = serde_yaml::to_string(config).expect("global config serializes");
    write_atomic(&path, data.as_bytes()).map_err(|source| ConfigError::PersistFailed {
        path: path.clone(),
        source,
    })?;
    *GLOBAL_CACHE.write() = Some(config.clone());
    tracing::debug!("saved global config to {}", path.display());
    Ok(())
}

/// Drop the cached global config. Tests that switch base directories use this.
pub fn invalidate_global_cache() {
    *GLOBAL_CACHE.write() = None;
}

// ---------------------------------------------------------------------------
// Project config
// ---------------------------------------------------------------------------

/// Load a project's config. Never cached: the file is user-edited.
pub fn load_project(base: &Path, project: &str) -> Result<ProjectConfig, ConfigError> {
    let path = project_base_path(base, project).join(PROJECT_CONFIG_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::ProjectNotFound(project.to_string()));
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    let mut config: ProjectConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.clone(),
            source,
        })?;
    config.project_name = project.to_string();
    Ok(config)
}

pub fn save_project(base: &Path, config: &ProjectConfig) -> Result<(), ConfigError> {
    let path = project_base_path(base, &config.project_name).join(PROJECT_CONFIG_FILE);
    let data = serde_yaml::to_string(config).expect("project config serializes");
    write_atomic(&path, data.as_bytes()).map_err(|source| ConfigError::PersistFailed {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("saved project config to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Effective domain
// ---------------------------------------------------------------------------

/// Resolve the domain a deployment should serve on.
///
/// Priority: explicit per-environment domain in the project config, then the
/// computed default `<project>-<env>.<defaultDomain>`.
pub fn effective_domain(
    global: &GlobalConfig,
    project: &ProjectConfig,
    env: Environment,
) -> Result<String, ConfigError> {
    let env_cfg =
        project
            .environment(env)
            .ok_or_else(|| ConfigError::EnvironmentUndefined {
                project: project.project_name.clone(),
                env,
            })?;

    if let Some(domain) = env_cfg.domain.as_deref() {
        if !domain.is_empty() {
            return Ok(domain.to_string());
        }
    }

    if global.default_domain.is_empty() {
        return Err(ConfigError::DomainUnresolved {
            project: project.project_name.clone(),
            env,
        });
    }

    if global.default_domain == DEFAULT_DOMAIN_PLACEHOLDER {
        tracing::warn!(
            "global defaultDomain is still the placeholder '{}'; edit {} before going live",
            DEFAULT_DOMAIN_PLACEHOLDER,
            GLOBAL_CONFIG_FILE
        );
    }
    if global.default_domain == "localhost" {
        tracing::warn!("defaultDomain 'localhost' only resolves on this host");
    }

    Ok(format!(
        "{}-{}.{}",
        project.project_name, env, global.default_domain
    ))
}
