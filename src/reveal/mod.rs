//! Reveal workflow subsystem.
//!
//! # Data Flow
//! ```text
//! KeyHandle
//!     → signer (public key)          Init → KeyResolved
//!     → codec (reveal with hints)    KeyResolved → Built
//!     → chain (branch, counter, fee) Built → Completed
//!     → codec (bytes, digest)        Completed → Digested
//!     → signer (signature)           Digested → Signed
//!     → chain (injection)            Signed → Broadcast → Done
//! ```
//!
//! # Design Decisions
//! - Strictly linear; each step consumes the previous step's output
//! - No retries inside a run; see `resilience::retries` for whole-run retries
//! - Exactly one outcome per run: an operation hash or a typed error

pub mod error;
pub mod state;
pub mod workflow;

pub use error::{Cause, RevealError};
pub use state::{RevealStage, RunState};
pub use workflow::{RevealHints, RevealWorkflow};
