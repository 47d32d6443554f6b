// ABOUTME: Error types for the container runtime wrapper.
// ABOUTME: Maps bollard's HTTP-status failures onto tagged variants per concern.

use thiserror::Error;

/// Marker returned when a caller's cancellation token fired mid-call.
/// Converts into each operation error so `with_cancel` stays generic.
pub struct OperationCancelled;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("container daemon unreachable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container name already in use: {0}")]
    Conflict(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("failed to start container: {0}")]
    StartFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("runtime error: {0}")]
    Runtime(String),
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("image build failed: {0}")]
    BuildFailed(String),

    #[error("failed to pull image: {0}")]
    PullFailed(String),

    #[error("image in use: {0}")]
    InUse(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("runtime error: {0}")]
    Runtime(String),
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("network not found: {0}")]
    NotFound(String),

    #[error("network already exists: {0}")]
    AlreadyExists(String),

    #[error("network in use: {0}")]
    InUse(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("runtime error: {0}")]
    Runtime(String),
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("container not running: {0}")]
    ContainerNotRunning(String),

    #[error("exec not found: {0}")]
    ExecNotFound(String),

    #[error("exec failed: {0}")]
    Failed(String),

    #[error("timeout inspecting exec")]
    InspectTimeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<OperationCancelled> for ContainerError {
    fn from(_: OperationCancelled) -> Self {
        ContainerError::Cancelled
    }
}

impl From<OperationCancelled> for ImageError {
    fn from(_: OperationCancelled) -> Self {
        ImageError::Cancelled
    }
}

impl From<OperationCancelled> for NetworkError {
    fn from(_: OperationCancelled) -> Self {
        NetworkError::Cancelled
    }
}

impl From<OperationCancelled> for ExecError {
    fn from(_: OperationCancelled) -> Self {
        ExecError::Cancelled
    }
}

// ---------------------------------------------------------------------------
// bollard error mapping
// ---------------------------------------------------------------------------

fn status_of(e: &bollard::errors::Error) -> Option<(u16, String)> {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.clone())),
        _ => None,
    }
}

pub(crate) fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::ImageNotFound(message),
        Some((409, message)) => ContainerError::Conflict(message),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

pub(crate) fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::NotFound(message),
        Some((304, message)) => ContainerError::AlreadyRunning(message),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

pub(crate) fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::NotFound(message),
        Some((304, message)) => ContainerError::NotRunning(message),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

pub(crate) fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::NotFound(message),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

pub(crate) fn map_image_remove_error(e: bollard::errors::Error, image: &str) -> ImageError {
    match status_of(&e) {
        Some((404, _)) => ImageError::NotFound(image.to_string()),
        Some((409, message)) => ImageError::InUse(message),
        _ => ImageError::Runtime(format!("failed to remove {image}: {e}")),
    }
}

pub(crate) fn map_network_create_error(e: bollard::errors::Error) -> NetworkError {
    match status_of(&e) {
        Some((409, message)) => NetworkError::AlreadyExists(message),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

pub(crate) fn map_network_remove_error(e: bollard::errors::Error) -> NetworkError {
    match status_of(&e) {
        Some((404, message)) => NetworkError::NotFound(message),
        Some((403, message)) => NetworkError::InUse(message),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

pub(crate) fn map_exec_create_error(e: bollard::errors::Error) -> ExecError {
    match status_of(&e) {
        Some((404, message)) => ExecError::ContainerNotFound(message),
        Some((409, message)) => ExecError::ContainerNotRunning(message),
        _ => ExecError::Runtime(e.to_string()),
    }
}

pub(crate) fn map_exec_not_found_error(e: bollard::errors::Error) -> ExecError {
    match status_of(&e) {
        Some((404, message)) => ExecError::ExecNotFound(message),
        _ => ExecError::Runtime(e.to_string()),
    }
}
