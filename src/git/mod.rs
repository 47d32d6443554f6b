// ABOUTME: Source acquisition through the system git binary.
// ABOUTME: Relies on ambient credentials (SSH agent, credential helpers); never prompts.

use crate::types::CommitHash;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("destination path '{0}' already exists")]
    DestinationExists(String),

    #[error("authentication required for repository access: {0}")]
    AuthRequired(String),

    #[error("network error during repository access: {0}")]
    Network(String),

    #[error("failed to resolve revision '{0}'")]
    RevisionUnresolvable(String),

    #[error("git operation cancelled")]
    Cancelled,

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Classify a failed transport operation by its stderr.
fn transport_error(command: &str, stderr: String) -> GitError {
    let lower = stderr.to_lowercase();
    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("could not read username")
        || lower.contains("could not read password")
    {
        GitError::AuthRequired(stderr)
    } else if lower.contains("could not resolve host")
        || lower.contains("unable to access")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
    {
        GitError::Network(stderr)
    } else {
        GitError::CommandFailed {
            command: command.to_string(),
            stderr,
        }
    }
}

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// Run git with the given args, racing the cancellation token.
///
/// `GIT_TERMINAL_PROMPT=0` keeps a missing credential from hanging the
/// workflow on an interactive prompt.
async fn run_git(
    cancel: &CancellationToken,
    cwd: Option<&Path>,
    args: &[&str],
) -> Result<GitOutput, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    tracing::debug!("running git {}", args.join(" "));

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(GitError::Cancelled),
        output = cmd.output() => output?,
    };

    Ok(GitOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Clone `url` into `dest`. Fails if `dest` already exists.
pub async fn clone(cancel: &CancellationToken, url: &str, dest: &Path) -> Result<(), GitError> {
    if dest.exists() {
        return Err(GitError::DestinationExists(dest.display().to_string()));
    }

    tracing::info!("cloning '{}' into '{}'", url, dest.display());
    let dest_str = dest.display().to_string();
    let output = run_git(cancel, None, &["clone", url, &dest_str]).await?;
    if !output.success {
        return Err(transport_error("clone", output.stderr));
    }

    tracing::info!("cloned '{}'", url);
    Ok(())
}

/// Fetch all remote refs. Already-up-to-date is success.
pub async fn fetch(cancel: &CancellationToken, repo: &Path) -> Result<(), GitError> {
    tracing::info!("fetching updates for repository at {}", repo.display());
    let output = run_git(
        cancel,
        Some(repo),
        &["fetch", "origin", "--tags", "--prune", "--force"],
    )
    .await?;
    if !output.success {
        return Err(transport_error("fetch", output.stderr));
    }
    Ok(())
}

/// Resolve a revision (branch, tag, short or full hash) to a full commit hash.
///
/// An empty revision or `HEAD` resolves to the tip of the default branch as
/// known to the local clone after fetch.
pub async fn resolve(
    cancel: &CancellationToken,
    repo: &Path,
    revision: &str,
) -> Result<CommitHash, GitError> {
    let target = if revision.is_empty() || revision == "HEAD" {
        // The remote's default branch; falls back to HEAD for fresh clones
        // where origin/HEAD was never recorded.
        let head = run_git(
            cancel,
            Some(repo),
            &["rev-parse", "--verify", "origin/HEAD^{commit}"],
        )
        .await?;
        if head.success {
            return parse_resolved(revision, &head.stdout);
        }
        "HEAD".to_string()
    } else {
        revision.to_string()
    };

    // Try the revision as given, then as a remote branch name.
    let spec = format!("{target}^{{commit}}");
    let output = run_git(cancel, Some(repo), &["rev-parse", "--verify", &spec]).await?;
    if output.success {
        return parse_resolved(revision, &output.stdout);
    }

    let remote_spec = format!("origin/{target}^{{commit}}");
    let output = run_git(cancel, Some(repo), &["rev-parse", "--verify", &remote_spec]).await?;
    if output.success {
        return parse_resolved(revision, &output.stdout);
    }

    Err(GitError::RevisionUnresolvable(display_revision(revision)))
}

fn display_revision(revision: &str) -> String {
    if revision.is_empty() {
        "HEAD".to_string()
    } else {
        revision.to_string()
    }
}

fn parse_resolved(revision: &str, stdout: &str) -> Result<CommitHash, GitError> {
    CommitHash::new(stdout.trim())
        .map_err(|_| GitError::RevisionUnresolvable(display_revision(revision)))
}

/// Detached checkout at `commit`, forcing past any dirty working tree.
pub async fn checkout(
    cancel: &CancellationToken,
    repo: &Path,
    commit: &CommitHash,
) -> Result<(), GitError> {
    tracing::info!("checking out {} in {}", commit.short(), repo.display());
    let output = run_git(
        cancel,
        Some(repo),
        &["checkout", "--force", "--detach", commit.as_str()],
    )
    .await?;
    if !output.success {
        return Err(GitError::CommandFailed {
            command: "checkout".to_string(),
            stderr: output.stderr,
        });
    }
    Ok(())
}
