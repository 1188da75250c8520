use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// One captured running configuration. Created once per detected change,
/// immutable afterwards; the next change supersedes it rather than mutating
/// it. History lives in the version-control remote, not in-process.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub fingerprint: Fingerprint,
    pub raw_text: String,
    pub captured_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    pub fn new(fingerprint: Fingerprint, raw_text: String) -> Self {
        Self {
            fingerprint,
            raw_text,
            captured_at: Utc::now(),
        }
    }

    /// Write the snapshot to its well-known path, overwriting any prior
    /// snapshot. The handle is scoped to this call so long-running loops
    /// never leak descriptors.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut text = self.raw_text.clone();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        std::fs::write(path, text)
    }
}

/// The identity and time of the last attributable configuration change,
/// extracted from the controller's own log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub user: String,
    pub timestamp: String,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persist_overwrites_prior_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configuration.txt");

        let first = ConfigSnapshot::new(
            Fingerprint::of_bytes(b"a"),
            "hostname controller-1".to_string(),
        );
        first.persist(&path).unwrap();

        let second = ConfigSnapshot::new(
            Fingerprint::of_bytes(b"b"),
            "hostname controller-2".to_string(),
        );
        second.persist(&path).unwrap();

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, "hostname controller-2\n");
    }

    #[test]
    fn test_persist_keeps_existing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configuration.txt");

        let snap = ConfigSnapshot::new(Fingerprint::of_bytes(b"a"), "line\n".to_string());
        snap.persist(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }
}
