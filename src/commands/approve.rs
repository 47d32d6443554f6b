// ABOUTME: Approve command implementation.
// ABOUTME: Promotes the staging commit to production, reusing the built image.

use super::cancel_on_ctrl_c;
use reflow::error::Result;
use reflow::orchestrator;
use reflow::runtime::RuntimeClient;
use reflow::types::ProjectName;
use std::path::Path;

pub async fn run(base: &Path, project: &str) -> Result<()> {
    let project = ProjectName::new(project)?;
    let docker = RuntimeClient::connect().await?;
    let cancel = cancel_on_ctrl_c();

    let outcome = orchestrator::approve(&docker, base, &project, "cli", &cancel).await?;

    println!("-----------------------------------------------------");
    println!("Promotion of project '{project}' to production successful!");
    println!("   Commit:  {} ({})", outcome.commit, outcome.commit.short());
    println!("   Slot:    {} ({})", outcome.slot, outcome.slot.color());
    if let Some(domain) = &outcome.domain {
        println!("   URL:     http://{domain} (ensure DNS points at this host)");
    }
    println!();
    println!("Next steps:");
    println!("  - Check status:  reflow project status {project}");
    println!("  - View logs:     reflow project logs {project} --env prod -f");
    println!("-----------------------------------------------------");

    Ok(())
}
