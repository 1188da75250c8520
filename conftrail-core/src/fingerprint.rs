use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;

/// Opaque content fingerprint of the watched configuration store.
///
/// Equality of fingerprints is the only operation the change-detection loop
/// needs; the digest is never decoded back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn of_bytes(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fingerprint of the file's contents at call time. Pure: no caching here;
/// the loop holds the previous value itself.
pub fn current_fingerprint<P: AsRef<Path>>(path: P) -> io::Result<Fingerprint> {
    let content = std::fs::read(path)?;
    Ok(Fingerprint::of_bytes(&content))
}
