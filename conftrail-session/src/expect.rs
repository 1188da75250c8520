//! Expect-style pattern waiting over an async byte stream.
//!
//! The engine accumulates output from the reader and resolves as soon as any
//! of the given literal patterns appears, handing back everything that came
//! before the match. Patterns may arrive split across reads. Every wait is
//! bounded by a timeout; the engine fails rather than hangs.

use std::io;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::trace;

#[derive(Error, Debug)]
pub enum ExpectError {
    #[error("Timed out waiting for an expected pattern")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of one `expect` call: either one of the patterns matched, or the
/// stream ended first. Both carry the text seen before the match point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matched {
    Pattern { index: usize, before: String },
    Eof { before: String },
}

pub struct Expect<R, W> {
    reader: R,
    writer: W,
    buffer: String,
}

impl<R, W> Expect<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            buffer: String::new(),
        }
    }

    /// Wait until any of `patterns` appears in the stream, or EOF, or the
    /// timeout elapses. The matched pattern itself is consumed; output after
    /// it stays buffered for the next call.
    pub async fn expect(
        &mut self,
        patterns: &[&str],
        timeout: Duration,
    ) -> Result<Matched, ExpectError> {
        match tokio::time::timeout(timeout, self.read_until_match(patterns)).await {
            Ok(result) => result,
            Err(_) => Err(ExpectError::Timeout),
        }
    }

    async fn read_until_match(&mut self, patterns: &[&str]) -> Result<Matched, ExpectError> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(matched) = self.scan(patterns) {
                return Ok(matched);
            }

            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                let before = std::mem::take(&mut self.buffer);
                return Ok(Matched::Eof { before });
            }
            self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
            trace!("Session buffer now {} bytes", self.buffer.len());
        }
    }

    /// Earliest match of any pattern in the buffer wins; ties go to the
    /// pattern listed first.
    fn scan(&mut self, patterns: &[&str]) -> Option<Matched> {
        let mut earliest: Option<(usize, usize, usize)> = None;
        for (index, pattern) in patterns.iter().enumerate() {
            if let Some(pos) = self.buffer.find(pattern) {
                let better = match earliest {
                    Some((_, best_pos, _)) => pos < best_pos,
                    None => true,
                };
                if better {
                    earliest = Some((index, pos, pattern.len()));
                }
            }
        }

        let (index, pos, len) = earliest?;
        let before = self.buffer[..pos].to_string();
        self.buffer.drain(..pos + len);
        Some(Matched::Pattern { index, before })
    }

    /// Send one line, newline-terminated, flushed before returning.
    pub async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// An expect engine wired to a spawned child process's piped stdio.
pub struct ChildExpect {
    pub child: Child,
    pub io: Expect<ChildStdout, ChildStdin>,
}

/// Spawn `command` with piped stdin/stdout and wrap it in an [`Expect`].
/// The child is killed on drop so an abandoned cycle never leaks a hung
/// process into the next iteration.
pub fn spawn_child(command: &mut Command) -> io::Result<ChildExpect> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("child stdin not captured"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout not captured"))?;

    Ok(ChildExpect {
        child,
        io: Expect::new(stdout, stdin),
    })
}
