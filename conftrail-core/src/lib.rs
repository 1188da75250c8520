//! # conftrail-core
//!
//! Core library for conftrail - configuration drift monitoring for SDN
//! controllers.
//!
//! This crate provides the fundamental data structures and leaf utilities:
//! content fingerprinting of the watched configuration store, the snapshot
//! and audit-record models, the audit log extractor, and the size-rotated
//! audit trail file.

pub mod audit;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod settings;

pub use audit::{last_change_author, AuditTrail};
pub use error::{ConfigError, ExtractError};
pub use fingerprint::{current_fingerprint, Fingerprint};
pub use models::{AuditRecord, ConfigSnapshot};
pub use settings::{ControllerSettings, NotifySettings, PublishSettings, Settings};
