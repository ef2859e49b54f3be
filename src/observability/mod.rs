//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Workflow and adapters produce:
//!     → logging.rs (structured log events, one span per reveal run)
//!     → metrics.rs (counters for runs, node calls, signer calls)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Each reveal run carries a run ID through every event
//! - Metrics are recorded through the `metrics` facade only; installing an
//!   exporter is left to the embedding application

pub mod logging;
pub mod metrics;
