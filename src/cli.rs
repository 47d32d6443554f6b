// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reflow")]
#[command(about = "Single-host blue/green deployment manager for containerized web apps")]
#[command(version)]
pub struct Cli {
    /// Base directory for configuration and state (default: ./reflow)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the environment: directories, network, and the proxy container
    Init,

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Deploy a project revision to the staging environment
    Deploy {
        /// Project name
        project: String,

        /// Branch, tag, or commit to deploy (default: tip of the default branch)
        revision: Option<String>,
    },

    /// Promote the commit active in staging to production
    Approve {
        /// Project name
        project: String,
    },

    /// Remove all managed containers, the proxy, the network, and the base directory
    Destroy {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Control plane server
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create and initialize a new project from a git repository
    Create {
        /// Project name (lowercase alphanumerics and hyphens)
        name: String,

        /// Git repository URL
        repo_url: String,

        /// Explicit domain for the staging environment
        #[arg(long)]
        staging_domain: Option<String>,

        /// Explicit domain for the production environment
        #[arg(long)]
        production_domain: Option<String>,
    },

    /// List all projects and their deployment status
    List,

    /// Show detailed status for a project
    Status {
        /// Project name
        name: String,
    },

    /// Start the active container for an environment
    Start {
        /// Project name
        name: String,

        /// Environment: test or prod
        #[arg(long, default_value = "test")]
        env: String,
    },

    /// Stop the active container for an environment
    Stop {
        /// Project name
        name: String,

        /// Environment: test or prod
        #[arg(long, default_value = "test")]
        env: String,
    },

    /// Stream logs from the active container
    Logs {
        /// Project name
        name: String,

        /// Environment: test or prod
        #[arg(long, default_value = "test")]
        env: String,

        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show from the end
        #[arg(long)]
        tail: Option<u64>,
    },

    /// Remove superseded containers (and optionally images)
    Cleanup {
        /// Project name
        name: String,

        /// Environment: test, prod, or all
        #[arg(long, default_value = "all")]
        env: String,

        /// Also remove images not active in either environment
        #[arg(long)]
        prune_images: bool,
    },

    /// View or edit the project configuration file
    Config {
        #[command(subcommand)]
        command: ProjectConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectConfigCommands {
    /// Print the project config file
    View {
        /// Project name
        name: String,
    },

    /// Open the project config file in $EDITOR
    Edit {
        /// Project name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ServerCommands {
    /// Start the HTTP control plane
    Start {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind
        #[arg(long, default_value_t = 8787)]
        port: u16,
    },
}
