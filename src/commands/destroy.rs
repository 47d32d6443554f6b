// ABOUTME: Destroy command implementation.
// ABOUTME: Tears down every managed resource after confirmation.

use super::cancel_on_ctrl_c;
use reflow::error::{Error, Result};
use reflow::orchestrator;
use reflow::runtime::RuntimeClient;
use std::path::Path;

pub async fn run(base: &Path, force: bool) -> Result<()> {
    let docker = RuntimeClient::connect().await?;
    let cancel = cancel_on_ctrl_c();

    orchestrator::destroy_all(&docker, base, force, &cancel)
        .await
        .map_err(Error::Deploy)?;

    println!("Environment destroyed.");
    Ok(())
}
