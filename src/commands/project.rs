// ABOUTME: Project subcommands: create, list, status, start/stop, logs, cleanup, config.
// ABOUTME: Thin dispatch over the project manager and orchestrator workflows.

use super::{cancel_on_ctrl_c, parse_envs};
use crate::cli::{ProjectCommands, ProjectConfigCommands};
use futures::StreamExt;
use reflow::config;
use reflow::error::{Error, Result};
use reflow::orchestrator::{self, DeployError};
use reflow::project;
use reflow::runtime::{RuntimeClient, LABEL_ENVIRONMENT, LABEL_PROJECT, LABEL_SLOT};
use reflow::types::{Environment, ProjectName};
use std::io::Write;
use std::path::Path;

pub async fn run(base: &Path, command: ProjectCommands) -> Result<()> {
    match command {
        ProjectCommands::Create {
            name,
            repo_url,
            staging_domain,
            production_domain,
        } => create(base, &name, &repo_url, staging_domain, production_domain).await,
        ProjectCommands::List => list(base),
        ProjectCommands::Status { name } => status(base, &name).await,
        ProjectCommands::Start { name, env } => start(base, &name, &env).await,
        ProjectCommands::Stop { name, env } => stop(base, &name, &env).await,
        ProjectCommands::Logs {
            name,
            env,
            follow,
            tail,
        } => logs(base, &name, &env, follow, tail).await,
        ProjectCommands::Cleanup {
            name,
            env,
            prune_images,
        } => cleanup(base, &name, &env, prune_images).await,
        ProjectCommands::Config { command } => match command {
            ProjectConfigCommands::View { name } => config_view(base, &name),
            ProjectConfigCommands::Edit { name } => config_edit(base, &name),
        },
    }
}

async fn create(
    base: &Path,
    name: &str,
    repo_url: &str,
    staging_domain: Option<String>,
    production_domain: Option<String>,
) -> Result<()> {
    let name = ProjectName::new(name)?;
    let cancel = cancel_on_ctrl_c();

    project::create(base, &name, repo_url, staging_domain, production_domain, &cancel).await?;

    println!("Project '{name}' created.");
    println!("  - Config: {}", config::project_base_path(base, name.as_str()).join(config::PROJECT_CONFIG_FILE).display());
    println!("  - Deploy with: reflow deploy {name}");
    Ok(())
}

fn list(base: &Path) -> Result<()> {
    let summaries = project::list(base)?;
    if summaries.is_empty() {
        println!("No projects found. Create one with 'reflow project create'.");
        return Ok(());
    }

    println!("{:<20} {:<28} {:<28} REPO", "PROJECT", "STAGING", "PRODUCTION");
    for summary in summaries {
        println!(
            "{:<20} {:<28} {:<28} {}",
            summary.name, summary.staging_status, summary.production_status, summary.repo_url
        );
    }
    Ok(())
}

async fn status(base: &Path, name: &str) -> Result<()> {
    let name = ProjectName::new(name)?;
    let docker = RuntimeClient::connect().await?;
    let cancel = cancel_on_ctrl_c();

    let details = project::status(&docker, base, &name, &cancel)
        .await
        .map_err(Error::Deploy)?;

    println!("Project: {}", details.name);
    println!("Repo:    {}", details.repo_url);
    for env in [&details.staging, &details.production] {
        println!();
        println!("[{}]", env.environment);
        if !env.is_active {
            println!("  Not deployed");
            continue;
        }
        println!("  Commit:    {}", &env.active_commit[..7.min(env.active_commit.len())]);
        println!("  Slot:      {} ({})", env.active_slot, env.slot_color);
        println!("  Container: {} ({})", env.container_name, env.container_status);
        println!("  Port:      {}", env.app_port);
        match &env.effective_domain {
            Some(domain) => println!("  Domain:    {domain}"),
            None => println!("  Domain:    (unresolved; set defaultDomain or a per-env domain)"),
        }
    }
    Ok(())
}

async fn start(base: &Path, name: &str, env: &str) -> Result<()> {
    let name = ProjectName::new(name)?;
    let env: Environment = env.parse()?;
    let docker = RuntimeClient::connect().await?;
    let cancel = cancel_on_ctrl_c();

    let started = orchestrator::start_project_env(&docker, base, &name, env, &cancel)
        .await
        .map_err(Error::Deploy)?;
    println!("Started {started} container(s) for {name}/{env}.");
    Ok(())
}

async fn stop(base: &Path, name: &str, env: &str) -> Result<()> {
    let name = ProjectName::new(name)?;
    let env: Environment = env.parse()?;
    let docker = RuntimeClient::connect().await?;
    let cancel = cancel_on_ctrl_c();

    let stopped = orchestrator::stop_project_env(&docker, base, &name, env, &cancel)
        .await
        .map_err(Error::Deploy)?;
    println!("Stopped {stopped} container(s) for {name}/{env}.");
    Ok(())
}

async fn logs(base: &Path, name: &str, env: &str, follow: bool, tail: Option<u64>) -> Result<()> {
    let name = ProjectName::new(name)?;
    let env: Environment = env.parse()?;
    let docker = RuntimeClient::connect().await?;
    let cancel = cancel_on_ctrl_c();

    let state = config::load_state(base, name.as_str())?;
    let env_state = state.env(env);
    if !env_state.is_deployed() {
        println!("No active deployment for {name}/{env}.");
        return Ok(());
    }

    let project_str = name.to_string();
    let env_str = env.to_string();
    let containers = docker
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
        println!("No container found for {name}/{env} slot {}.", env_state.active_slot);
        return Ok(());
    };

    let mut stream = docker.container_logs(&container.id, follow, tail);
    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = stream.next() => match line {
                Some(Ok(text)) => {
                    let _ = stdout.write_all(text.as_bytes());
                    let _ = stdout.flush();
                }
                Some(Err(e)) => return Err(Error::Container(e)),
                None => break,
            },
        }
    }
    Ok(())
}

async fn cleanup(base: &Path, name: &str, env: &str, prune_images: bool) -> Result<()> {
    let name = ProjectName::new(name)?;
    let envs = parse_envs(env)?;
    let docker = RuntimeClient::connect().await?;
    let cancel = cancel_on_ctrl_c();

    match orchestrator::cleanup(&docker, base, &name, &envs, prune_images, &cancel).await {
        Ok(report) => {
            println!(
                "Cleanup complete: removed {} container(s), {} image(s).",
                report.containers_removed, report.images_removed
            );
            Ok(())
        }
        Err((report, e)) => {
            println!(
                "Cleanup finished with errors: removed {} container(s), {} image(s).",
                report.containers_removed, report.images_removed
            );
            Err(Error::Deploy(e))
        }
    }
}

fn config_view(base: &Path, name: &str) -> Result<()> {
    let name = ProjectName::new(name)?;
    let path = config::project_base_path(base, name.as_str()).join(config::PROJECT_CONFIG_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::Config(config::ConfigError::ProjectNotFound(name.to_string()))
        } else {
            Error::Io(e)
        }
    })?;
    print!("{content}");
    Ok(())
}

fn config_edit(base: &Path, name: &str) -> Result<()> {
    let name = ProjectName::new(name)?;
    let path = config::project_base_path(base, name.as_str()).join(config::PROJECT_CONFIG_FILE);
    if !path.exists() {
        return Err(Error::Config(config::ConfigError::ProjectNotFound(
            name.to_string(),
        )));
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = std::process::Command::new(&editor).arg(&path).status()?;
    if !status.success() {
        return Err(Error::Io(std::io::Error::other(format!(
            "editor '{editor}' exited with {status}"
        ))));
    }

    // Surface syntax errors right away instead of at the next deploy.
    if let Err(e) = config::load_project(base, name.as_str()) {
        return Err(Error::Deploy(DeployError::Config(e)));
    }
    println!("Updated {}.", path.display());
    Ok(())
}
