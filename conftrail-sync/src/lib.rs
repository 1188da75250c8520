//! # conftrail-sync
//!
//! Repository synchronization for conftrail: reconcile the local working
//! copy against its remote before a new snapshot is written, and publish the
//! stage→commit→push cycle afterwards. The push step drives its own
//! interactive credential exchange, structurally the same protocol as the
//! controller session's authentication.

pub mod capability;
pub mod error;
pub mod push;
pub mod sync;

pub use capability::{GitCapability, SubprocessGit};
pub use error::SyncError;
pub use sync::{RepositoryState, SyncStatus, Synchronizer};
