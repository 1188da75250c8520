//! The controller retrieval protocol.
//!
//! One linear state machine with a single branch at the banner: the
//! controller either asks for a password (active node) or announces itself
//! as the cluster standby, which must never be treated as a source of truth.
//! Standby is detected *before* any credentials are sent.

use crate::error::SessionError;
use crate::expect::{spawn_child, Expect, Matched};
use async_trait::async_trait;
use conftrail_core::ControllerSettings;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Command;
use tracing::{debug, info, warn};

const PASSWORD_PROMPT: &str = "Password:";
const STANDBY_MARKER: &str = "SLAVE";
const COMMAND_PROMPT: &str = ">";
const SHOW_COMMAND: &str = "show run";
const EXIT_COMMAND: &str = "exit";

/// Bound on each pattern wait. A controller that stops talking mid-exchange
/// fails the cycle instead of hanging the loop.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Connected, waiting for the first challenge or the standby banner.
    AwaitingBanner,
    /// Password sent, waiting for the command prompt.
    Authenticating,
    /// Command sent, capturing everything up to the next prompt.
    AwaitingOutput,
}

/// Drive the retrieve protocol over an already-open session.
///
/// The capture boundary is prompt-delimited, not length-delimited: the
/// payload is everything the controller emits between the command and the
/// next prompt, minus the echoed command line, preserved verbatim including
/// interior blank lines.
pub async fn run_session<R, W>(
    io: &mut Expect<R, W>,
    password: &str,
    step_timeout: Duration,
) -> Result<String, SessionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = State::AwaitingBanner;

    loop {
        match state {
            State::AwaitingBanner => {
                match io
                    .expect(&[PASSWORD_PROMPT, STANDBY_MARKER], step_timeout)
                    .await?
                {
                    Matched::Pattern { index: 0, .. } => {
                        debug!("Password challenge received, authenticating");
                        io.send_line(password)
                            .await
                            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;
                        state = State::Authenticating;
                    }
                    Matched::Pattern { .. } => {
                        warn!("Standby controller detected, aborting before authentication");
                        return Err(SessionError::Standby);
                    }
                    Matched::Eof { before } => {
                        return Err(SessionError::ConnectionFailed(closed_early(&before)));
                    }
                }
            }
            State::Authenticating => match io.expect(&[COMMAND_PROMPT], step_timeout).await? {
                Matched::Pattern { .. } => {
                    io.send_line(SHOW_COMMAND)
                        .await
                        .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;
                    state = State::AwaitingOutput;
                }
                Matched::Eof { before } => {
                    return Err(SessionError::ConnectionFailed(closed_early(&before)));
                }
            },
            State::AwaitingOutput => match io.expect(&[COMMAND_PROMPT], step_timeout).await? {
                Matched::Pattern { before, .. } => {
                    let config = strip_echo(&before, SHOW_COMMAND);
                    // Best-effort goodbye; the payload is already captured.
                    let _ = io.send_line(EXIT_COMMAND).await;
                    info!("Pulled configuration from the controller ({} bytes)", config.len());
                    return Ok(config);
                }
                Matched::Eof { before } => {
                    return Err(SessionError::ConnectionFailed(closed_early(&before)));
                }
            },
        }
    }
}

fn closed_early(before: &str) -> String {
    let tail = before.trim_end();
    if tail.is_empty() {
        "session closed before the expected prompt".to_string()
    } else {
        format!("session closed before the expected prompt: {}", tail)
    }
}

/// The captured text starts with the controller echoing the command back and
/// ends with the line break that precedes the prompt. Both are framing, not
/// payload.
fn strip_echo(before: &str, command: &str) -> String {
    let without_echo = match before.split_once('\n') {
        Some((first_line, rest)) if first_line.trim_end_matches('\r').trim() == command => rest,
        _ => before,
    };

    without_echo
        .strip_suffix("\r\n")
        .or_else(|| without_echo.strip_suffix('\n'))
        .unwrap_or(without_echo)
        .to_string()
}

/// One retrieval attempt: ssh to the controller, authenticate, run the show
/// command, capture the prompt-delimited output, exit.
pub async fn retrieve_config(settings: &ControllerSettings) -> Result<String, SessionError> {
    let mut command = Command::new("ssh");
    command
        .arg("-o")
        .arg("UserKnownHostsFile /dev/null")
        .arg("-o")
        .arg("StrictHostKeyChecking no")
        .arg(format!("{}@{}", settings.username, settings.host));

    let mut session =
        spawn_child(&mut command).map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

    let result = run_session(&mut session.io, &settings.password, STEP_TIMEOUT).await;

    // The session is done either way; reap the child rather than relying on
    // kill-on-drop alone.
    let _ = session.child.start_kill();
    let _ = session.child.wait().await;

    result
}

/// Seam between the pipeline and the controller. The ssh client is the real
/// implementation; tests script their own.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn retrieve(&self) -> Result<String, SessionError>;
}

pub struct SshClient {
    settings: ControllerSettings,
}

impl SshClient {
    pub fn new(settings: ControllerSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ConfigSource for SshClient {
    async fn retrieve(&self) -> Result<String, SessionError> {
        retrieve_config(&self.settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run_transcript(transcript: &str) -> (Result<String, SessionError>, Vec<u8>) {
        let mut io = Expect::new(transcript.as_bytes(), Vec::new());
        let result = run_session(&mut io, "hunter2", Duration::from_secs(1)).await;
        let (_, written) = io.into_inner();
        (result, written)
    }

    #[tokio::test]
    async fn test_full_retrieval() {
        let transcript = "controller-1 login\nPassword: \ncontroller-1> show run\n\
                          hostname controller-1\ninterface ethernet1\n  role active\n> ";
        let (result, written) = run_transcript(transcript).await;

        assert_eq!(
            result.unwrap(),
            "hostname controller-1\ninterface ethernet1\n  role active"
        );
        assert_eq!(written, b"hunter2\nshow run\nexit\n");
    }

    #[tokio::test]
    async fn test_capture_preserves_interior_blank_lines() {
        let transcript = "Password: \n> show run\nbanner start\n\n\nbanner end\n> ";
        let (result, _) = run_transcript(transcript).await;

        assert_eq!(result.unwrap(), "banner start\n\n\nbanner end");
    }

    #[tokio::test]
    async fn test_standby_short_circuits_without_credentials() {
        let transcript = "controller-2 is in SLAVE mode\n";
        let (result, written) = run_transcript(transcript).await;

        assert!(matches!(result, Err(SessionError::Standby)));
        // No credential-bearing byte ever left the client.
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_standby_wins_even_when_password_prompt_follows() {
        let transcript = "SLAVE node\nPassword: ";
        let (result, written) = run_transcript(transcript).await;

        assert!(matches!(result, Err(SessionError::Standby)));
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_connection_closed_before_banner() {
        let (result, _) = run_transcript("ssh: connect to host refused\n").await;
        assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_connection_closed_after_authentication() {
        let (result, _) = run_transcript("Password: \nConnection reset by peer\n").await;
        assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_controller_times_out() {
        let (client, _held_open) = tokio::io::duplex(64);
        let (reader, writer) = tokio::io::split(client);
        let mut io = Expect::new(reader, writer);

        let result = run_session(&mut io, "hunter2", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(SessionError::Timeout)));
    }

    #[test]
    fn test_strip_echo_without_echo_present() {
        assert_eq!(strip_echo("payload\n", "show run"), "payload");
    }

    #[test]
    fn test_strip_echo_crlf_framing() {
        assert_eq!(strip_echo("show run\r\npayload\r\n", "show run"), "payload");
    }
}
