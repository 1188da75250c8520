//! The change-detection loop and the per-change pipeline.

use crate::notifier::Notifier;
use anyhow::{Context, Result};
use conftrail_core::{
    current_fingerprint, last_change_author, AuditTrail, ConfigSnapshot, Fingerprint, Settings,
};
use conftrail_session::{ConfigSource, SessionError};
use conftrail_sync::{GitCapability, Synchronizer};
use tracing::{debug, error, info, warn};

const NOTIFY_SUBJECT: &str = "****** Updated Controller Configuration ALERT ******";
const NOTIFY_BODY: &str =
    "Hello\n****** A new configuration file has been uploaded to the repository ******\n\nBye\n";

/// The loop's only mutable state: the fingerprint baseline from the
/// previous poll.
#[derive(Debug, Default)]
struct LoopState {
    previous: Option<Fingerprint>,
}

pub struct Monitor<S, G> {
    settings: Settings,
    source: S,
    synchronizer: Option<Synchronizer<G>>,
    notifier: Box<dyn Notifier>,
    trail: AuditTrail,
    state: LoopState,
}

impl<S, G> Monitor<S, G>
where
    S: ConfigSource,
    G: GitCapability,
{
    pub fn new(
        settings: Settings,
        source: S,
        synchronizer: Option<Synchronizer<G>>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let trail = AuditTrail::new(settings.trail_path());
        Self {
            settings,
            source,
            synchronizer,
            notifier,
            trail,
            state: LoopState::default(),
        }
    }

    /// Run forever. There is no graceful shutdown signal; termination is
    /// external, between iterations.
    pub async fn run(mut self) {
        info!(
            "Watching {} every {:?}",
            self.settings.store_path.display(),
            self.settings.interval
        );

        loop {
            tokio::time::sleep(self.settings.interval).await;
            self.poll_once().await;
        }
    }

    /// One poll: fingerprint the store and, on change, run the pipeline.
    ///
    /// The baseline is advanced *before* retrieval starts. This is a
    /// deliberate debounce: rapid consecutive edits collapse into one
    /// retrieval, and a failed retrieval is not retried until the store
    /// changes again.
    pub async fn poll_once(&mut self) {
        let current = match current_fingerprint(&self.settings.store_path) {
            Ok(fp) => fp,
            Err(e) => {
                match self.state.previous {
                    // No baseline yet; the store may simply not exist until
                    // the controller first persists a configuration.
                    None => debug!("Configuration store not readable yet: {}", e),
                    Some(_) => warn!("Failed to fingerprint the configuration store: {}", e),
                }
                return;
            }
        };

        let changed = match &self.state.previous {
            None => {
                debug!("Established fingerprint baseline {}", current);
                None
            }
            Some(previous) if *previous == current => None,
            Some(_) => Some(current.clone()),
        };

        self.state.previous = Some(current);

        if let Some(fingerprint) = changed {
            info!("New configuration has been detected");
            if let Err(e) = self.run_cycle(fingerprint).await {
                error!("Cycle abandoned: {:#}", e);
            }
        }
    }

    /// The linear pipeline for one detected change: retrieve → reconcile →
    /// snapshot → audit → publish → notify. Exactly one snapshot write per
    /// detected change, and never without a successful non-standby
    /// retrieval.
    async fn run_cycle(&self, fingerprint: Fingerprint) -> Result<()> {
        let config = match self.source.retrieve().await {
            Ok(config) => config,
            Err(SessionError::Standby) => {
                warn!("Standby controller; skipping this change, the node may become active later");
                return Ok(());
            }
            Err(e) => return Err(e).context("configuration retrieval failed"),
        };

        if let Some(sync) = &self.synchronizer {
            sync.sync_before()
                .await
                .context("pre-write reconciliation failed")?;
        }

        let snapshot = ConfigSnapshot::new(fingerprint, config);
        snapshot
            .persist(self.settings.snapshot_path())
            .context("failed to write the snapshot")?;
        info!(
            "Snapshot written to {} ({} bytes, captured {})",
            self.settings.snapshot_path().display(),
            snapshot.raw_text.len(),
            snapshot.captured_at
        );

        if self.settings.audit_enabled {
            // Audit trouble is reported but never blocks the publish; the
            // snapshot itself is the primary artifact.
            match last_change_author(&self.settings.controller_log) {
                Ok(record) => {
                    self.trail
                        .append(&record)
                        .context("failed to append to the audit trail")?;
                }
                Err(e) => warn!("Audit extraction failed: {}", e),
            }
        }

        if let Some(sync) = &self.synchronizer {
            sync.publish().await.context("publish failed")?;
            info!("Pushed updated configuration to the remote");
        }

        self.notifier
            .notify(NOTIFY_SUBJECT, NOTIFY_BODY)
            .await
            .context("notification failed")?;

        Ok(())
    }
}
