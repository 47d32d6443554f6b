// ABOUTME: Server command implementation.
// ABOUTME: Starts the localhost HTTP control plane.

use crate::cli::ServerCommands;
use reflow::api;
use reflow::error::Result;
use reflow::runtime::RuntimeClient;
use std::path::Path;

pub async fn run(base: &Path, command: ServerCommands) -> Result<()> {
    match command {
        ServerCommands::Start { host, port } => {
            let docker = RuntimeClient::connect().await?;
            api::serve(base.to_path_buf(), docker, &host, port).await?;
            Ok(())
        }
    }
}
