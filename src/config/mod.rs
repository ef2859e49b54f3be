//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply environment overrides)
//!     → validation.rs (semantic checks)
//!     → RevealConfig (validated, immutable)
//!     → consumed once at startup to build the signer, client and workflow
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_with, ConfigError, ConfigOverrides};
pub use schema::{
    FeeConfig, FeePolicyKind, NodeConfig, ObservabilityConfig, RetryConfig, RevealConfig,
    SignerConfig,
};
