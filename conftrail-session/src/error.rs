use crate::expect::ExpectError;
use thiserror::Error;

/// Errors from one retrieval attempt against the controller.
///
/// Only `Timeout` is a candidate for a future retry; `Standby` and
/// `ConnectionFailed` abandon the current cycle outright and nothing is
/// written or published.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No expected prompt appeared within the bounded wait")]
    Timeout,

    #[error("Controller is the standby node; its configuration is not authoritative")]
    Standby,

    #[error("Connection to the controller failed: {0}")]
    ConnectionFailed(String),
}

impl From<ExpectError> for SessionError {
    fn from(err: ExpectError) -> Self {
        match err {
            ExpectError::Timeout => SessionError::Timeout,
            ExpectError::Io(e) => SessionError::ConnectionFailed(e.to_string()),
        }
    }
}
