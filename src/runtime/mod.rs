// ABOUTME: Thin wrapper over the local container daemon via bollard.
// ABOUTME: All operations race the caller's cancellation token.

mod client;
mod container;
mod error;
mod image;
mod network;

pub use client::RuntimeClient;
pub use container::{
    BindMount, ContainerInspect, ContainerSummary, ExecStatus, PublishedPort, RunSpec,
    LABEL_COMMIT, LABEL_ENVIRONMENT, LABEL_MANAGED, LABEL_PROJECT, LABEL_SLOT,
};
pub use error::{ClientError, ContainerError, ExecError, ImageError, NetworkError};
pub use image::ImageRecord;

use error::OperationCancelled;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race an in-flight daemon call against the caller's cancellation token.
///
/// Cancellation mid-call aborts the request; the orchestrator treats the
/// resulting error as a failed step and rolls back.
pub(crate) async fn with_cancel<T, E>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, E>
where
    E: From<OperationCancelled>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OperationCancelled.into()),
        result = fut => result,
    }
}
