// ABOUTME: Application-wide error type for the CLI surface.
// ABOUTME: Aggregates the module error enums; every failure exits non-zero with one cause line.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Deploy(#[from] crate::orchestrator::DeployError),

    #[error(transparent)]
    Project(#[from] crate::project::ProjectError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Client(#[from] crate::runtime::ClientError),

    #[error(transparent)]
    Container(#[from] crate::runtime::ContainerError),

    #[error(transparent)]
    Image(#[from] crate::runtime::ImageError),

    #[error(transparent)]
    Network(#[from] crate::runtime::NetworkError),

    #[error("invalid project name: {0}")]
    InvalidProjectName(#[from] crate::types::ProjectNameError),

    #[error(transparent)]
    InvalidEnvironment(#[from] crate::types::ParseEnvironmentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
