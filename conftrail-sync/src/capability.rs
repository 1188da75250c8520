//! The git capability interface and its subprocess-backed implementation.
//!
//! The synchronizer only knows {pull, status, stage_all, commit, push};
//! swapping the subprocess client for a library-based one changes nothing
//! above this seam.

use crate::error::SyncError;
use crate::push::{authenticate_push, AUTH_STEP_TIMEOUT};
use async_trait::async_trait;
use conftrail_session::expect::spawn_child;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

#[async_trait]
pub trait GitCapability: Send + Sync {
    /// Pull from the remote; returns git's own report text.
    async fn pull(&self) -> Result<String, SyncError>;

    /// Working-copy status; returns git's own report text.
    async fn status(&self) -> Result<String, SyncError>;

    async fn stage_all(&self) -> Result<(), SyncError>;

    /// Commit staged changes. Nothing staged is a no-op, not an error.
    async fn commit(&self, message: &str) -> Result<(), SyncError>;

    /// Push to `origin <branch>`, driving the interactive credential
    /// exchange when the remote asks for one.
    async fn push(&self, branch: &str, username: &str, password: &str) -> Result<(), SyncError>;
}

/// Shells out to the `git` binary with `-C <repo>` so no working-directory
/// juggling is needed.
pub struct SubprocessGit {
    repo_dir: PathBuf,
}

impl SubprocessGit {
    pub fn new<P: Into<PathBuf>>(repo_dir: P) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<(bool, String), SyncError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .output()
            .await
            .map_err(|e| SyncError::PushRejected(format!("failed to run git: {}", e)))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        debug!("git {:?} -> {}", args, text.trim_end());
        Ok((output.status.success(), text))
    }
}

#[async_trait]
impl GitCapability for SubprocessGit {
    async fn pull(&self) -> Result<String, SyncError> {
        let (_, text) = self.run(&["pull"]).await?;
        Ok(text)
    }

    async fn status(&self) -> Result<String, SyncError> {
        let (_, text) = self.run(&["status"]).await?;
        Ok(text)
    }

    async fn stage_all(&self) -> Result<(), SyncError> {
        let (ok, text) = self.run(&["add", "."]).await?;
        if ok {
            Ok(())
        } else {
            Err(SyncError::PushRejected(format!("git add failed: {}", text)))
        }
    }

    async fn commit(&self, message: &str) -> Result<(), SyncError> {
        let (ok, text) = self.run(&["commit", "-m", message]).await?;
        // git exits nonzero when there is nothing to commit; the push of an
        // already-committed state is still wanted.
        if ok || text.contains("nothing to commit") || text.contains("nothing added to commit") {
            Ok(())
        } else {
            Err(SyncError::PushRejected(format!("git commit failed: {}", text)))
        }
    }

    async fn push(&self, branch: &str, username: &str, password: &str) -> Result<(), SyncError> {
        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(&self.repo_dir)
            .arg("push")
            .arg("origin")
            .arg(branch);

        let mut session = spawn_child(&mut command)
            .map_err(|e| SyncError::PushRejected(format!("failed to run git push: {}", e)))?;

        let exchange =
            authenticate_push(&mut session.io, username, password, AUTH_STEP_TIMEOUT).await;

        if exchange.is_err() {
            let _ = session.child.start_kill();
        }
        let status = session.child.wait().await;

        let output = exchange?;
        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(SyncError::PushRejected(format!(
                "git push exited with {}: {}",
                status,
                output.trim_end()
            ))),
            Err(e) => Err(SyncError::PushRejected(e.to_string())),
        }
    }
}
