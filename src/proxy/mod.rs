// ABOUTME: Reverse proxy control: render site configs, write them, signal a reload.
// ABOUTME: One config file per (project, environment); the proxy serializes reloads.

use crate::config::{self, write_atomic, PROXY_CONTAINER_NAME};
use crate::runtime::{ContainerError, RuntimeClient};
use crate::template::{render, TemplateError};
use crate::types::{Environment, ProjectName, Slot};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const RELOAD_SIGNAL: &str = "HUP";

/// How long workers get to apply a new config before the traffic path is
/// retested. Tunable in one place if 1s proves too short under load.
const RELOAD_SETTLE: Duration = Duration::from_secs(1);

/// Deadline for inspecting the proxy container and for signal delivery.
const PROXY_OP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("proxy container '{name}' unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("failed to reload proxy: {0}")]
    ReloadFailed(String),

    #[error("failed to render proxy config: {0}")]
    Render(#[from] TemplateError),

    #[error("failed to write proxy config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("proxy reload cancelled")]
    Cancelled,
}

const SITE_TEMPLATE: &str = r#"# Upstream for {{projectName}} - {{env}} - slot {{slot}}
# Points at the one container holding this deployment slot
upstream reflow_{{projectName}}_{{env}}_{{slot}}_upstream {
    server {{containerName}}:{{appPort}};
}

server {
    listen 80;
    listen [::]:80;

    server_name {{domain}};

    location / {
        proxy_pass http://reflow_{{projectName}}_{{env}}_{{slot}}_upstream;
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection 'upgrade';
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_cache_bypass $http_upgrade;
    }

    access_log /var/log/nginx/{{projectName}}.{{env}}.access.log;
    error_log /var/log/nginx/{{projectName}}.{{env}}.error.log;
}
"#;

/// Catch-all server block written once by init; unknown hosts get a 404.
pub const DEFAULT_SITE_CONFIG: &str = r#"server {
    listen 80 default_server;
    listen [::]:80 default_server;
    server_name _;

    location / {
        return 404;
    }

    access_log /var/log/nginx/default.access.log;
    error_log /var/log/nginx/default.error.log;
}
"#;

/// Render the site config fragment for one deployment slot.
pub fn render_site_config(
    project: &ProjectName,
    env: Environment,
    slot: Slot,
    container_name: &str,
    domain: &str,
    app_port: u16,
) -> Result<String, TemplateError> {
    let mut vars = BTreeMap::new();
    vars.insert("projectName", project.to_string());
    vars.insert("env", env.to_string());
    vars.insert("slot", slot.to_string());
    vars.insert("containerName", container_name.to_string());
    vars.insert("domain", domain.to_string());
    vars.insert("appPort", app_port.to_string());
    render(SITE_TEMPLATE, &vars)
}

pub fn site_config_path(base: &Path, project: &str, env: Environment) -> PathBuf {
    config::proxy_conf_dir(base).join(format!("{project}.{env}.conf"))
}

/// Write the site config for (project, env), replacing any previous one.
pub fn write_site_config(
    base: &Path,
    project: &ProjectName,
    env: Environment,
    content: &str,
) -> Result<(), ProxyError> {
    let path = site_config_path(base, project.as_str(), env);
    write_atomic(&path, content.as_bytes()).map_err(|source| ProxyError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::info!("updated proxy config file: {}", path.display());
    Ok(())
}

/// Signal the proxy to reload its configuration and wait for it to settle.
///
/// The proxy container must exist and be running; a reload against a dead
/// proxy would silently leave traffic on the old upstream.
pub async fn reload(docker: &RuntimeClient, cancel: &CancellationToken) -> Result<(), ProxyError> {
    tracing::info!("reloading proxy configuration");

    let inspect = tokio::time::timeout(
        PROXY_OP_TIMEOUT,
        docker.inspect_container(cancel, PROXY_CONTAINER_NAME),
    )
    .await
    .map_err(|_| ProxyError::Unavailable {
        name: PROXY_CONTAINER_NAME.to_string(),
        reason: "inspect timed out".to_string(),
    })?;

    let details = match inspect {
        Ok(details) => details,
        Err(ContainerError::Cancelled) => return Err(ProxyError::Cancelled),
        Err(ContainerError::NotFound(_)) => {
            return Err(ProxyError::Unavailable {
                name: PROXY_CONTAINER_NAME.to_string(),
                reason: "container not found (was 'reflow init' run?)".to_string(),
            });
        }
        Err(e) => {
            return Err(ProxyError::Unavailable {
                name: PROXY_CONTAINER_NAME.to_string(),
                reason: e.to_string(),
            });
        }
    };

    if !details.running {
        return Err(ProxyError::Unavailable {
            name: PROXY_CONTAINER_NAME.to_string(),
            reason: "container is not running".to_string(),
        });
    }

    let kill = tokio::time::timeout(
        PROXY_OP_TIMEOUT,
        docker.kill_container(cancel, PROXY_CONTAINER_NAME, RELOAD_SIGNAL),
    )
    .await
    .map_err(|_| ProxyError::ReloadFailed("timeout sending reload signal".to_string()))?;

    match kill {
        Ok(()) => {}
        Err(ContainerError::Cancelled) => return Err(ProxyError::Cancelled),
        Err(e) => return Err(ProxyError::ReloadFailed(e.to_string())),
    }

    // Give workers time to pick up the new config before anything retests
    // the traffic path.
    tokio::time::sleep(RELOAD_SETTLE).await;

    tracing::info!("proxy configuration reloaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectName {
        ProjectName::new("myblog").unwrap()
    }

    #[test]
    fn site_config_declares_upstream_server() {
        let conf = render_site_config(
            &project(),
            Environment::Staging,
            Slot::B,
            "myblog-staging-B-abc1234",
            "myblog-staging.example.com",
            3000,
        )
        .unwrap();

        assert!(conf.contains("server myblog-staging-B-abc1234:3000;"));
        assert!(conf.contains("server_name myblog-staging.example.com;"));
        assert!(conf.contains("upstream reflow_myblog_staging_B_upstream"));
        assert!(conf.contains("proxy_set_header Upgrade $http_upgrade;"));
        assert!(conf.contains("/var/log/nginx/myblog.staging.access.log"));
        assert!(conf.contains("/var/log/nginx/myblog.staging.error.log"));
    }

    #[test]
    fn site_config_path_uses_project_and_env() {
        let path = site_config_path(Path::new("/srv/reflow"), "myblog", Environment::Production);
        assert_eq!(
            path,
            Path::new("/srv/reflow/proxy/conf.d/myblog.production.conf")
        );
    }

    #[test]
    fn write_site_config_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_site_config(
            dir.path(),
            &project(),
            Environment::Staging,
            "server {}\n",
        )
        .unwrap();

        let written =
            std::fs::read_to_string(site_config_path(dir.path(), "myblog", Environment::Staging))
                .unwrap();
        assert_eq!(written, "server {}\n");
    }
}
