//! Audit log extraction and the persisted audit trail.
//!
//! The controller maintains its own append-only log; configuration
//! operations show up there as session-scoped entries. The extractor pulls
//! the most recent such entry apart into an [`AuditRecord`]; the trail file
//! accumulates those records with a size-based rotation so it never grows
//! unboundedly.

use crate::error::ExtractError;
use crate::models::AuditRecord;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Marker identifying a session-scoped entry in the controller log. Doubles
/// as the start delimiter of the session id field so the line filter and the
/// grammar cannot drift apart.
const SESSION_MARKER: &str = "Session@";
/// Marker identifying a configuration-operation entry.
const OPERATION_MARKER: &str = "Operation";

/// One field of a log line, bounded by a start and end delimiter. A missing
/// delimiter surfaces as [`ExtractError::MalformedLine`] naming it.
struct Field {
    start: &'static str,
    end: &'static str,
}

impl Field {
    fn extract<'a>(&self, line: &'a str) -> Result<&'a str, ExtractError> {
        let after_start = line
            .split_once(self.start)
            .ok_or_else(|| ExtractError::MalformedLine(self.start.to_string()))?
            .1;
        let value = after_start
            .split_once(self.end)
            .ok_or_else(|| ExtractError::MalformedLine(self.end.to_string()))?
            .0;
        Ok(value)
    }
}

// The end delimiters include the `=` so a line where the field syntax has
// drifted (a bare `Operation` token, say) is malformed rather than silently
// split at the wrong place.
const SESSION_ID: Field = Field {
    start: SESSION_MARKER,
    end: " User=",
};

const USER: Field = Field {
    start: "User=",
    end: " Operation=",
};

/// Extract the most recent attributable configuration change from the
/// controller log at `log_path`.
///
/// The log is assumed append-only and chronologically ordered, so the last
/// qualifying line in file order is the most recent change. The timestamp is
/// the first three whitespace-separated tokens of that line.
pub fn last_change_author<P: AsRef<Path>>(log_path: P) -> Result<AuditRecord, ExtractError> {
    let text = std::fs::read_to_string(log_path)?;

    let candidate = text
        .lines()
        .filter(|line| line.contains(SESSION_MARKER) && line.contains(OPERATION_MARKER))
        .next_back()
        .ok_or(ExtractError::NoMatchingEntries)?;

    debug!("Last qualifying log line: {}", candidate);

    let session_id = SESSION_ID.extract(candidate)?.to_string();
    let user = USER.extract(candidate)?.to_string();

    let tokens: Vec<&str> = candidate.split_whitespace().take(3).collect();
    if tokens.len() < 3 {
        return Err(ExtractError::MalformedLine("timestamp".to_string()));
    }
    let timestamp = tokens.join(" ");

    info!("Last configuration change was done by user: {}", user);

    Ok(AuditRecord {
        user,
        timestamp,
        session_id,
    })
}

/// Trail file exceeding this many bytes is truncated and restarted instead
/// of grown further.
pub const TRAIL_ROTATE_BYTES: u64 = 1_000_000;

/// Append-only audit trail with size-based rotation.
pub struct AuditTrail {
    path: PathBuf,
    rotate_bytes: u64,
}

impl AuditTrail {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            rotate_bytes: TRAIL_ROTATE_BYTES,
        }
    }

    pub fn with_rotate_bytes(mut self, rotate_bytes: u64) -> Self {
        self.rotate_bytes = rotate_bytes;
        self
    }

    /// Append `record` to the trail. Creates the file if absent; a trail at
    /// or above the rotation threshold is truncated first so the trail never
    /// grows unboundedly across an indefinitely running loop.
    pub fn append(&self, record: &AuditRecord) -> std::io::Result<()> {
        let rotate = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() >= self.rotate_bytes,
            Err(_) => false,
        };

        if rotate {
            info!(
                "Audit trail {} reached {} bytes, rotating",
                self.path.display(),
                self.rotate_bytes
            );
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(!rotate)
            .write(true)
            .truncate(rotate)
            .open(&self.path)?;

        writeln!(
            file,
            "Last configuration change was done by user: {}",
            record.user
        )?;
        writeln!(file, "Date is: {}", record.timestamp)?;
        writeln!(file, "Session is: {}", record.session_id)?;
        writeln!(file)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LOG: &str = "\
2024-01-01 09:00:00 +0000 boot sequence complete
2024-01-01 09:30:00 +0000 Session@S9 User=bob Operation=delete Details=policy
2024-01-01 09:45:00 +0000 health check ok
2024-01-01 10:00:00 +0000 Session@S1 User=alice Operation=create Details=vlan
";

    fn write_log(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("floodlight.log");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_extracts_last_qualifying_line() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, LOG);

        let record = last_change_author(&path).unwrap();
        assert_eq!(record.user, "alice");
        assert_eq!(record.session_id, "S1");
        assert_eq!(record.timestamp, "2024-01-01 10:00:00 +0000");
    }

    #[test]
    fn test_no_qualifying_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "2024-01-01 09:00:00 +0000 boot sequence complete\n");

        match last_change_author(&path) {
            Err(ExtractError::NoMatchingEntries) => {}
            other => panic!("expected NoMatchingEntries, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_user_delimiter_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_log(
            &dir,
            "2024-01-01 10:00:00 +0000 Session@S1 Operation=create Details=vlan\n",
        );

        match last_change_author(&path) {
            Err(ExtractError::MalformedLine(delim)) => assert_eq!(delim, " User="),
            other => panic!("expected MalformedLine, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_line_is_malformed_not_empty() {
        // `User=` present but nothing terminates it: format drift, not a
        // quiet log.
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, "2024-01-01 10:00:00 +0000 Session@S1 User=alice Operation\n");

        match last_change_author(&path) {
            Err(ExtractError::MalformedLine(_)) => {}
            other => panic!("expected MalformedLine, got {:?}", other),
        }
    }

    fn record() -> AuditRecord {
        AuditRecord {
            user: "alice".to_string(),
            timestamp: "2024-01-01 10:00:00 +0000".to_string(),
            session_id: "S1".to_string(),
        }
    }

    #[test]
    fn test_append_creates_and_preserves() {
        let dir = TempDir::new().unwrap();
        let trail = AuditTrail::new(dir.path().join("userslog.txt"));

        trail.append(&record()).unwrap();
        let mut second = record();
        second.user = "bob".to_string();
        trail.append(&second).unwrap();

        let contents = fs::read_to_string(dir.path().join("userslog.txt")).unwrap();
        assert!(contents.contains("user: alice"));
        assert!(contents.contains("user: bob"));
        // alice's entry came first and survived the second append
        assert!(contents.find("alice").unwrap() < contents.find("bob").unwrap());
    }

    #[test]
    fn test_append_rotates_at_threshold() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("userslog.txt");
        fs::write(&path, "x".repeat(64)).unwrap();

        let trail = AuditTrail::new(&path).with_rotate_bytes(64);
        trail.append(&record()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("xxxx"));
        assert!(contents.contains("user: alice"));
    }
}
