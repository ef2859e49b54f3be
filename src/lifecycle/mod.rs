//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build signer and node client → Workflow
//!
//! Cancellation (cancel.rs):
//!     Token triggered → every pending workflow step stops at its next await
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger cancellation
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Cancellation is cooperative; an injection already in flight completes

pub mod cancel;
pub mod signals;
pub mod startup;

pub use cancel::{CancelSignal, CancelToken};
