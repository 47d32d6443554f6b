// ABOUTME: Transport-layer readiness probe run from inside the proxy container.
// ABOUTME: Exercises the same DNS and network path the proxy will use for real traffic.

use crate::config::PROXY_CONTAINER_NAME;
use crate::runtime::{ExecError, RuntimeClient};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const CONNECT_TIMEOUT_SECS: u32 = 2;
const INSPECT_POLL_INTERVAL: Duration = Duration::from_millis(200);
const INSPECT_DEADLINE: Duration = Duration::from_secs(5);

/// Probe whether `container_name:port` accepts TCP connections, from inside
/// the proxy container.
///
/// Each call is a fresh exec of `nc -z`; callers drive retries. Returns
/// `Ok(true)` only when the probe exits zero.
pub async fn probe(
    docker: &RuntimeClient,
    cancel: &CancellationToken,
    container_name: &str,
    app_port: u16,
) -> Result<bool, ExecError> {
    let cmd = vec![
        "nc".to_string(),
        "-z".to_string(),
        "-w".to_string(),
        CONNECT_TIMEOUT_SECS.to_string(),
        container_name.to_string(),
        app_port.to_string(),
    ];

    tracing::debug!(
        "probing {container_name}:{app_port} from '{PROXY_CONTAINER_NAME}'"
    );

    let exec_id = docker
        .exec_create(cancel, PROXY_CONTAINER_NAME, cmd)
        .await?;
    docker.exec_start_and_drain(cancel, &exec_id).await?;

    // The exec may report running for a moment after the stream drains; poll
    // until it settles or the deadline passes.
    let deadline = tokio::time::Instant::now() + INSPECT_DEADLINE;
    loop {
        let status = docker.exec_inspect(cancel, &exec_id).await?;
        if !status.running {
            let exit_code = status.exit_code.unwrap_or(-1);
            tracing::debug!("probe exec finished with exit code {exit_code}");
            return Ok(exit_code == 0);
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(ExecError::InspectTimeout);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecError::Cancelled),
            _ = tokio::time::sleep(INSPECT_POLL_INTERVAL) => {}
        }
    }
}
