//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to its defaults when omitted.

use serde::{Deserialize, Serialize};

use crate::tezos::ChainId;

/// Root configuration for the reveal tool.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RevealConfig {
    /// Node RPC endpoints.
    pub node: NodeConfig,

    /// Remote signing service.
    pub signer: SignerConfig,

    /// Fee and limit hints.
    pub fees: FeeConfig,

    /// Whole-run retry policy.
    pub retries: RetryConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Node RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Primary RPC endpoint URL.
    pub rpc_url: String,

    /// Endpoints tried in order when the primary fails.
    pub failover_urls: Vec<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Chain name used in RPC paths (`/chains/{chain}/...`).
    pub chain: String,

    /// How many blocks behind head the operation branch is taken from.
    pub branch_offset: u32,

    /// Refuse to operate if the node reports a different chain.
    pub expected_chain_id: Option<ChainId>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8732".to_string(),
            failover_urls: Vec::new(),
            timeout_secs: 30,
            chain: "main".to_string(),
            branch_offset: 2,
            expected_chain_id: None,
        }
    }
}

/// Key management service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Base URL of the KMS REST API.
    pub endpoint: String,

    /// Resource name of the key version to sign with.
    pub key_handle: Option<String>,

    /// Environment variable holding the bearer token.
    pub access_token_env: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Verify every returned signature locally before broadcasting.
    pub verify_signatures: bool,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloudkms.googleapis.com/v1".to_string(),
            key_handle: None,
            access_token_env: "GOOGLE_OAUTH_ACCESS_TOKEN".to_string(),
            timeout_secs: 30,
            verify_signatures: false,
        }
    }
}

/// How the fee is chosen during completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeePolicyKind {
    /// Smallest fee the node's mempool filter accepts.
    #[default]
    Minimum,
    /// Use `fixed_fee` as given.
    Fixed,
}

/// Fee and limit configuration. Amounts are in mutez.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    pub policy: FeePolicyKind,

    /// Required when `policy = "fixed"`.
    pub fixed_fee: Option<u64>,

    /// Upper bound on any fee the tool will sign.
    pub max_fee: u64,

    /// Fee the operation is built with before completion.
    pub fee_hint: u64,

    pub gas_limit: u64,

    pub storage_limit: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            policy: FeePolicyKind::Minimum,
            fixed_fee: None,
            max_fee: 5000,
            fee_hint: 300,
            gas_limit: 180,
            storage_limit: 0,
        }
    }
}

/// Retry configuration for whole reveal runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
