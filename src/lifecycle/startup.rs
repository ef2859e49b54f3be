//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a ready workflow
//! - Construct the signer and node client in dependency order
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Nothing here touches the network; the first request happens in the run

use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{ChainError, FeePolicy, RpcClient};
use crate::config::{ConfigError, RevealConfig};
use crate::reveal::{RevealHints, RevealWorkflow};
use crate::signer::{KeyHandle, KmsSigner, SignerError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("signer setup failed: {0}")]
    Signer(#[from] SignerError),
    #[error("node client setup failed: {0}")]
    Chain(#[from] ChainError),
}

/// The configured key handle, for commands that need one.
pub fn key_handle(config: &RevealConfig) -> Result<KeyHandle, ConfigError> {
    config
        .signer
        .key_handle
        .as_deref()
        .map(KeyHandle::new)
        .ok_or(ConfigError::Missing("signer.key_handle"))
}

/// Node client for `config`.
pub fn build_chain_client(config: &RevealConfig) -> Result<RpcClient, StartupError> {
    Ok(RpcClient::new(&config.node)?.with_max_fee(config.fees.max_fee))
}

/// Workflow wired to the KMS signer and the configured node.
pub fn build_workflow(config: &RevealConfig) -> Result<RevealWorkflow, StartupError> {
    let signer = KmsSigner::new(&config.signer)?;
    let chain = build_chain_client(config)?;

    tracing::info!(
        rpc_url = %config.node.rpc_url,
        failover_count = config.node.failover_urls.len(),
        kms_endpoint = %config.signer.endpoint,
        "workflow initialized"
    );

    Ok(RevealWorkflow::new(Arc::new(signer), Arc::new(chain))
        .with_hints(RevealHints::from(&config.fees))
        .with_fee_policy(FeePolicy::from_config(&config.fees))
        .with_signature_verification(config.signer.verify_signatures))
}
