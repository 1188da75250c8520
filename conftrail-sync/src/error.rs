use thiserror::Error;

/// Publish-cycle errors. Both are terminal for the current cycle; the next
/// detected change starts a fresh attempt.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote authentication failed; check the publish username and password")]
    AuthenticationFailed,

    #[error("Push did not complete: {0}")]
    PushRejected(String),
}
