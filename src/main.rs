// ABOUTME: Entry point for the reflow CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use reflow::config;
use reflow::error::{Error, Result};
use reflow::orchestrator::DeployError;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let base = match resolve_base_path(cli.config.as_deref()) {
        Ok(base) => base,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // The global config may enable debug even without the flag.
    let debug = cli.debug || config::load_global(&base).map(|g| g.debug).unwrap_or(false);
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("using base path: {}", base.display());

    if let Err(e) = run(cli, base).await {
        handle_error(e);
    }
}

/// Resolve the base directory: `--config` or `./reflow` under the cwd.
fn resolve_base_path(flag: Option<&std::path::Path>) -> std::io::Result<PathBuf> {
    match flag {
        Some(path) => {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                Ok(env::current_dir()?.join(path))
            }
        }
        None => Ok(env::current_dir()?.join("reflow")),
    }
}

/// Print a single human-readable cause line (plus a hint where one helps)
/// and exit non-zero.
fn handle_error(e: Error) -> ! {
    match &e {
        Error::Deploy(DeployError::HealthTimeout { seconds, .. }) => {
            eprintln!("Error: {e}");
            eprintln!("       Tip: the app never accepted connections within {seconds}s; check its logs");
        }
        Error::Deploy(DeployError::NothingToApprove(project)) => {
            eprintln!("Error: {e}");
            eprintln!("       Tip: run 'reflow deploy {project}' first, then approve");
        }
        Error::Deploy(DeployError::StatePersistFailed(_)) => {
            eprintln!("Error: {e}");
            eprintln!("       The new deployment IS live; fix the state file before the next rollout");
        }
        Error::Config(config::ConfigError::ProjectNotFound(name)) => {
            eprintln!("Error: {e}");
            eprintln!("       Tip: 'reflow project create {name} <repo-url>' sets it up");
        }
        Error::Client(_) => {
            eprintln!("Error: {e}");
            eprintln!("       Tip: check that the container daemon is running and accessible");
        }
        _ => {
            eprintln!("Error: {e}");
        }
    }
    std::process::exit(1);
}

async fn run(cli: Cli, base: PathBuf) -> Result<()> {
    match cli.command {
        Commands::Init => commands::init::run(&base).await,
        Commands::Project { command } => commands::project::run(&base, command).await,
        Commands::Deploy { project, revision } => {
            commands::deploy::run(&base, &project, revision.as_deref()).await
        }
        Commands::Approve { project } => commands::approve::run(&base, &project).await,
        Commands::Destroy { force } => commands::destroy::run(&base, force).await,
        Commands::Server { command } => commands::server::run(&base, command).await,
        Commands::Version => {
            println!("reflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
