//! The interactive push-authentication sub-protocol.
//!
//! The publish remote asks for credentials over the push process's own
//! terminal stream: `Username:` then `Password:`, then either a clean end of
//! stream or an explicit failure marker. `fatal` in the output that follows
//! credential submission also means the credentials were not accepted.

use crate::error::SyncError;
use conftrail_session::expect::{Expect, ExpectError, Matched};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

const USERNAME_PROMPT: &str = "Username:";
const PASSWORD_PROMPT: &str = "Password:";
const AUTH_FAILED_MARKER: &str = "Authentication failed";
const FATAL_MARKER: &str = "fatal";

/// Bound on each pattern wait during the credential exchange.
pub const AUTH_STEP_TIMEOUT: Duration = Duration::from_secs(60);

/// Drive the credential exchange until the push process finishes talking.
///
/// Returns the output seen after the exchange. A push that never asks for
/// credentials (key- or helper-based auth) ends the stream immediately;
/// that is not an error here, the caller judges it by the process exit
/// status.
pub async fn authenticate_push<R, W>(
    io: &mut Expect<R, W>,
    username: &str,
    password: &str,
    step_timeout: Duration,
) -> Result<String, SyncError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match expect_step(io, &[USERNAME_PROMPT], step_timeout).await? {
        Matched::Eof { before } => {
            debug!("Push finished without a credential challenge");
            return Ok(before);
        }
        Matched::Pattern { .. } => {}
    }

    io.send_line(username)
        .await
        .map_err(|e| SyncError::PushRejected(e.to_string()))?;

    match expect_step(io, &[PASSWORD_PROMPT], step_timeout).await? {
        Matched::Pattern { .. } => {}
        Matched::Eof { .. } => {
            return Err(SyncError::PushRejected(
                "remote closed the session before asking for a password".to_string(),
            ));
        }
    }

    io.send_line(password)
        .await
        .map_err(|e| SyncError::PushRejected(e.to_string()))?;

    match expect_step(io, &[AUTH_FAILED_MARKER], step_timeout).await? {
        Matched::Pattern { .. } => Err(SyncError::AuthenticationFailed),
        Matched::Eof { before } => {
            if before.contains(FATAL_MARKER) {
                Err(SyncError::AuthenticationFailed)
            } else {
                Ok(before)
            }
        }
    }
}

async fn expect_step<R, W>(
    io: &mut Expect<R, W>,
    patterns: &[&str],
    step_timeout: Duration,
) -> Result<Matched, SyncError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    io.expect(patterns, step_timeout).await.map_err(|e| match e {
        ExpectError::Timeout => {
            SyncError::PushRejected("timed out waiting for the remote".to_string())
        }
        ExpectError::Io(e) => SyncError::PushRejected(e.to_string()),
    })
}
