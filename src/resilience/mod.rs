//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Adapter call (signer, node):
//!     → timeouts.rs (every network call has a deadline)
//!
//! Whole reveal run (caller side):
//!     → retries.rs (retry only what is safe to retry)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - The workflow itself never retries; retries wrap whole runs
//! - An ambiguous broadcast is never retried automatically

pub mod backoff;
pub mod retries;
pub mod timeouts;
