//! # conftrail-session
//!
//! Interactive remote-session plumbing for conftrail.
//!
//! Two things live here: a small expect-style engine ([`expect::Expect`])
//! that waits, with a bounded timeout, for any of a set of literal patterns
//! on an async byte stream, and the controller session client
//! ([`client::retrieve_config`]) built on top of it. The repository
//! synchronizer reuses the engine for its own push-authentication exchange.

pub mod client;
pub mod error;
pub mod expect;

pub use client::{retrieve_config, ConfigSource, SshClient};
pub use error::SessionError;
pub use expect::{spawn_child, ChildExpect, Expect, ExpectError, Matched};
