use thiserror::Error;

/// Startup-time configuration errors. Fatal: the process exits non-zero
/// before the monitor loop starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

/// Audit log extraction errors. `NoMatchingEntries` means a genuinely quiet
/// log; `MalformedLine` means the log format has drifted.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No session-scoped operation entries found in the log")]
    NoMatchingEntries,

    #[error("Malformed log line: missing `{0}` delimiter")]
    MalformedLine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
