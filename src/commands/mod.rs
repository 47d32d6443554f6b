// ABOUTME: CLI command handlers: thin glue between clap and the library workflows.
// ABOUTME: Each handler wires up the daemon client and a ctrl-c cancellation token.

pub mod approve;
pub mod deploy;
pub mod destroy;
pub mod init;
pub mod project;
pub mod server;

use reflow::error::Result;
use reflow::types::Environment;
use tokio_util::sync::CancellationToken;

/// A token that fires when the user interrupts the process. Workflows treat
/// cancellation like any failed step and roll back.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            child.cancel();
        }
    });
    token
}

/// Parse an `--env` flag value: a single environment or `all`.
pub fn parse_envs(value: &str) -> Result<Vec<Environment>> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(Environment::ALL.to_vec());
    }
    Ok(vec![value.parse::<Environment>()?])
}
