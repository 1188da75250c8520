//! # conftrail-monitor
//!
//! The change-detection loop: poll the watched configuration store's
//! fingerprint and, on change, run the linear retrieval pipeline
//! (retrieve → reconcile → snapshot → audit → publish → notify). One
//! pipeline iteration at a time; per-cycle failures are reported and the
//! loop carries on.

pub mod notifier;
pub mod pipeline;

pub use notifier::{NoopNotifier, Notifier, SmtpNotifier};
pub use pipeline::Monitor;
