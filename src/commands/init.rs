// ABOUTME: Init command: directories, global config, network, and the proxy container.
// ABOUTME: Idempotent; safe to re-run on a host that is already set up.

use super::cancel_on_ctrl_c;
use reflow::config::{
    self, GlobalConfig, APPS_DIR, GLOBAL_CONFIG_FILE, INTERNAL_STATE_DIR, NETWORK_NAME,
    PROXY_CONTAINER_NAME, PROXY_IMAGE,
};
use reflow::error::{Error, Result};
use reflow::proxy::DEFAULT_SITE_CONFIG;
use reflow::runtime::{BindMount, ContainerError, PublishedPort, RunSpec, RuntimeClient};
use bollard::models::RestartPolicyNameEnum;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio_util::sync::CancellationToken;

pub async fn run(base: &Path) -> Result<()> {
    tracing::info!("initializing environment at {}", base.display());
    let cancel = cancel_on_ctrl_c();

    check_git_available().await?;
    create_directories(base)?;
    create_default_global_config(base)?;

    tracing::info!("checking daemon connectivity");
    let docker = RuntimeClient::connect().await?;

    docker.ensure_network(&cancel, NETWORK_NAME).await.map_err(Error::Network)?;
    create_default_proxy_config(base)?;
    setup_proxy_container(&docker, base, &cancel).await?;

    tracing::info!("environment initialized successfully");
    println!("Initialized reflow at {}", base.display());
    println!("  - network '{NETWORK_NAME}' ready");
    println!("  - proxy container '{PROXY_CONTAINER_NAME}' running");
    println!("Create a project with 'reflow project create <name> <repo-url>'.");
    Ok(())
}

/// Cloning projects shells out to git; fail early if it isn't installed.
async fn check_git_available() -> Result<()> {
    let status = tokio::process::Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "'git' command not found; install git and ensure it is in PATH",
        ))),
    }
}

fn create_directories(base: &Path) -> Result<()> {
    let dirs = [
        base.join(APPS_DIR),
        config::proxy_conf_dir(base),
        config::proxy_log_dir(base),
        base.join(INTERNAL_STATE_DIR),
    ];

    for dir in dirs {
        std::fs::create_dir_all(&dir)?;
        tracing::debug!("ensured directory: {}", dir.display());
    }
    Ok(())
}

/// Write the default global config only when none exists.
fn create_default_global_config(base: &Path) -> Result<()> {
    let path = base.join(GLOBAL_CONFIG_FILE);
    if path.exists() {
        tracing::info!("global config already exists at {}, keeping it", path.display());
        return Ok(());
    }

    config::save_global(base, &GlobalConfig::initial())?;
    tracing::info!("created default global config: {}", path.display());
    tracing::warn!("edit '{}' to set your actual defaultDomain", path.display());
    Ok(())
}

/// Write the catch-all site config only when none exists.
fn create_default_proxy_config(base: &Path) -> Result<()> {
    let path = config::proxy_conf_dir(base).join("00-default.conf");
    if path.exists() {
        tracing::debug!("default proxy config already exists, keeping it");
        return Ok(());
    }

    std::fs::write(&path, DEFAULT_SITE_CONFIG)?;
    tracing::info!("created default proxy config: {}", path.display());
    Ok(())
}

/// Pull the proxy image and create+start the proxy container if absent.
async fn setup_proxy_container(
    docker: &RuntimeClient,
    base: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    match docker.inspect_container(cancel, PROXY_CONTAINER_NAME).await {
        Ok(existing) => {
            tracing::info!(
                "proxy container '{PROXY_CONTAINER_NAME}' already exists, ensuring it is running"
            );
            docker.start_container(cancel, &existing.id).await?;
            return Ok(());
        }
        Err(ContainerError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    docker.pull_image(cancel, PROXY_IMAGE).await.map_err(Error::Image)?;

    let conf_dir = config::proxy_conf_dir(base);
    let log_dir = config::proxy_log_dir(base);
    std::fs::create_dir_all(&conf_dir)?;
    std::fs::create_dir_all(&log_dir)?;

    let spec = RunSpec {
        image: PROXY_IMAGE.to_string(),
        name: PROXY_CONTAINER_NAME.to_string(),
        network: NETWORK_NAME.to_string(),
        labels: HashMap::new(),
        env: Vec::new(),
        app_port: 80,
        restart_policy: RestartPolicyNameEnum::UNLESS_STOPPED,
        publish_ports: vec![
            PublishedPort {
                container_port: 80,
                host_port: 80,
            },
            PublishedPort {
                container_port: 443,
                host_port: 443,
            },
        ],
        binds: vec![
            BindMount {
                source: conf_dir.display().to_string(),
                target: "/etc/nginx/conf.d".to_string(),
                read_only: true,
            },
            BindMount {
                source: log_dir.display().to_string(),
                target: "/var/log/nginx".to_string(),
                read_only: false,
            },
        ],
    };

    tracing::info!("creating proxy container '{PROXY_CONTAINER_NAME}'");
    match docker.run_container(cancel, &spec).await {
        Ok(id) => {
            tracing::info!("proxy container started ({})", id.short());
            Ok(())
        }
        // Lost a race with a concurrent init; make sure the winner runs.
        Err(ContainerError::Conflict(_)) => {
            let existing = docker.inspect_container(cancel, PROXY_CONTAINER_NAME).await?;
            docker.start_container(cancel, &existing.id).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
