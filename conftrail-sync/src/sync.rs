//! The synchronizer: reconcile before writing, publish after.

use crate::capability::GitCapability;
use crate::error::SyncError;
use conftrail_core::PublishSettings;
use tracing::info;

/// The fixed commit message for every snapshot publish.
const COMMIT_MESSAGE: &str = "adding new configuration file";

/// Local markers in `git pull` output meaning the working copy already
/// matches the remote. Git changed the wording over the years; both forms
/// are accepted.
const UP_TO_DATE_MARKERS: [&str; 2] = ["Already up to date", "Already up-to-date"];

/// Working-copy state relative to the remote. Re-derived fresh on every
/// synchronization attempt; never cached across cycles, because the remote
/// may advance between any two calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryState {
    pub local_changes: bool,
    pub ahead_of_remote: bool,
}

impl RepositoryState {
    pub fn from_status(status: &str) -> Self {
        Self {
            local_changes: status.contains("modified"),
            ahead_of_remote: status.contains("Your branch is ahead"),
        }
    }

    pub fn needs_publish(&self) -> bool {
        self.local_changes || self.ahead_of_remote
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// The working copy already matched the remote; nothing was done.
    UpToDate,
    /// Local changes were staged, committed, and pushed.
    Published,
}

pub struct Synchronizer<G> {
    git: G,
    branch: String,
    username: String,
    password: String,
}

impl<G: GitCapability> Synchronizer<G> {
    pub fn new(git: G, publish: &PublishSettings) -> Self {
        Self {
            git,
            branch: publish.branch.clone(),
            username: publish.username.clone(),
            password: publish.password.clone(),
        }
    }

    /// Reconcile the working copy with the remote before the new snapshot
    /// lands. An up-to-date pull ends the reconciliation; anything else
    /// means stray local state, which is committed and pushed out of the way
    /// so the snapshot write starts from a clean baseline.
    pub async fn sync_before(&self) -> Result<SyncStatus, SyncError> {
        let pulled = self.git.pull().await?;
        if UP_TO_DATE_MARKERS.iter().any(|m| pulled.contains(m)) {
            info!("Working copy already matches the remote");
            return Ok(SyncStatus::UpToDate);
        }

        info!("Working copy out of date with the remote, reconciling");
        self.push_cycle().await?;
        Ok(SyncStatus::Published)
    }

    /// Stage→commit→push after the snapshot is written. State is re-derived
    /// from `git status` here even if `sync_before` just ran: the remote may
    /// have advanced in between, and a successful reconcile does not imply a
    /// successful publish.
    pub async fn publish(&self) -> Result<(), SyncError> {
        let state = RepositoryState::from_status(&self.git.status().await?);
        if state.needs_publish() {
            info!(
                "Working copy has unpublished state (modified: {}, ahead: {})",
                state.local_changes, state.ahead_of_remote
            );
        }

        self.push_cycle().await
    }

    async fn push_cycle(&self) -> Result<(), SyncError> {
        self.git.stage_all().await?;
        self.git.commit(COMMIT_MESSAGE).await?;
        self.git
            .push(&self.branch, &self.username, &self.password)
            .await
    }
}
