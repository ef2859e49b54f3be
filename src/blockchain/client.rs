//! Node RPC client with timeouts and endpoint failover.
//!
//! # Responsibilities
//! - Resolve and cache the chain id, enforcing the expected one
//! - Complete a reveal: branch, protocol, counter and fee
//! - Inject signed operations and classify failures
//!
//! Reads walk the endpoint list in order until one answers. Injection only
//! moves to the next endpoint when the previous one could not be connected
//! to, since anything later may already have reached a node.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::blockchain::fees::{apply_policy, FeeParams, FeePolicy};
use crate::blockchain::types::{rejection_reason, ChainClient, ChainError, ChainResult, NodeError};
use crate::codec::{RevealOperation, SignedOperation, UnsignedOperation};
use crate::config::NodeConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::bounded;
use crate::tezos::{Address, BlockHash, ChainId, OperationHash, ProtocolParams};

/// Default upper bound on the fee of a completed operation, in mutez.
pub const DEFAULT_MAX_FEE: u64 = 5000;

/// Tezos node RPC client.
pub struct RpcClient {
    client: reqwest::Client,
    /// Primary endpoint first, then failovers.
    endpoints: Vec<String>,
    chain: String,
    branch_offset: u32,
    expected_chain_id: Option<ChainId>,
    timeout: Duration,
    max_fee: u64,
    chain_id: OnceCell<ChainId>,
}

#[derive(Debug, Deserialize)]
struct Protocols {
    next_protocol: String,
}

impl RpcClient {
    /// Create a client for the configured endpoints.
    ///
    /// Invalid failover URLs are skipped with a warning; an invalid primary
    /// URL is an error.
    pub fn new(config: &NodeConfig) -> ChainResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut endpoints = Vec::with_capacity(1 + config.failover_urls.len());

        let primary = url::Url::parse(&config.rpc_url).map_err(|e| {
            ChainError::NodeUnavailable(format!("invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        endpoints.push(primary.as_str().trim_end_matches('/').to_string());

        for url_str in &config.failover_urls {
            match url::Url::parse(url_str) {
                Ok(url) => endpoints.push(url.as_str().trim_end_matches('/').to_string()),
                Err(_) => tracing::warn!(url = %url_str, "ignoring invalid failover RPC URL"),
            }
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::NodeUnavailable(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoints,
            chain: config.chain.clone(),
            branch_offset: config.branch_offset,
            expected_chain_id: config.expected_chain_id,
            timeout,
            max_fee: DEFAULT_MAX_FEE,
            chain_id: OnceCell::new(),
        })
    }

    /// Cap the fee any completed operation may carry.
    pub fn with_max_fee(mut self, max_fee: u64) -> Self {
        self.max_fee = max_fee;
        self
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    fn chain_path(&self, suffix: &str) -> String {
        format!("/chains/{}/{}", self.chain, suffix)
    }

    fn contract_path(&self, address: &Address, field: &str) -> String {
        self.chain_path(&format!(
            "blocks/head/context/contracts/{}/{}",
            address, field
        ))
    }

    /// GET `path` from the first endpoint that answers.
    async fn get_json<T: DeserializeOwned>(&self, label: &'static str, path: &str) -> ChainResult<T> {
        for (i, base) in self.endpoints.iter().enumerate() {
            let url = format!("{base}{path}");
            let attempt = bounded(self.timeout, self.fetch_json(&url), |d| {
                ChainError::NodeUnavailable(format!("no response after {}s", d.as_secs()))
            })
            .await;

            match attempt {
                Ok(value) => {
                    metrics::record_rpc_request(label, true);
                    return Ok(value);
                }
                Err(ChainError::NodeUnavailable(reason)) => {
                    metrics::record_rpc_request(label, false);
                    tracing::warn!(provider_idx = i, endpoint = label, error = %reason, "RPC error, trying next endpoint");
                }
                Err(e) => {
                    metrics::record_rpc_request(label, false);
                    return Err(e);
                }
            }
        }
        Err(ChainError::NodeUnavailable(format!(
            "all RPC endpoints failed for {label}"
        )))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> ChainResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ChainError::NodeUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::NodeUnavailable(format!("{status}: {}", body.trim())));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::InvalidResponse(format!(
                "{status}: {}",
                rejection_reason(&body)
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))
    }

    async fn fetch_chain_id(&self) -> ChainResult<ChainId> {
        let raw: String = self.get_json("chain_id", &self.chain_path("chain_id")).await?;
        let chain_id: ChainId = raw
            .parse()
            .map_err(|e| ChainError::InvalidResponse(format!("chain id '{raw}': {e}")))?;

        if let Some(expected) = self.expected_chain_id {
            if expected != chain_id {
                return Err(ChainError::ChainMismatch {
                    expected,
                    actual: chain_id,
                });
            }
        }
        tracing::info!(chain_id = %chain_id, "chain id resolved");
        Ok(chain_id)
    }

    async fn branch(&self) -> ChainResult<BlockHash> {
        let path = self.chain_path(&format!("blocks/head~{}/hash", self.branch_offset));
        let raw: String = self.get_json("branch", &path).await?;
        raw.parse()
            .map_err(|e| ChainError::InvalidResponse(format!("block hash '{raw}': {e}")))
    }

    async fn protocol(&self) -> ChainResult<ProtocolParams> {
        let protocols: Protocols = self
            .get_json("protocols", &self.chain_path("blocks/head/protocols"))
            .await?;
        Ok(ProtocolParams::for_protocol(&protocols.next_protocol))
    }

    async fn ensure_unrevealed(&self, source: &Address) -> ChainResult<()> {
        let manager_key: Option<String> = self
            .get_json("manager_key", &self.contract_path(source, "manager_key"))
            .await?;
        match manager_key {
            Some(key) => {
                tracing::debug!(source = %source, manager_key = %key, "source already revealed");
                Err(ChainError::AlreadyRevealed(*source))
            }
            None => Ok(()),
        }
    }

    /// Next usable counter for `source`.
    async fn next_counter(&self, source: &Address) -> ChainResult<u64> {
        let raw: String = self
            .get_json("counter", &self.contract_path(source, "counter"))
            .await?;
        let current: u64 = raw
            .parse()
            .map_err(|e| ChainError::InvalidResponse(format!("counter '{raw}': {e}")))?;
        current
            .checked_add(1)
            .ok_or_else(|| ChainError::InvalidResponse("counter overflow".into()))
    }

    async fn fee_params(&self) -> FeeParams {
        match self
            .get_json::<serde_json::Value>("mempool_filter", &self.chain_path("mempool/filter"))
            .await
        {
            Ok(filter) => FeeParams::from_mempool_filter(&filter),
            Err(e) => {
                tracing::warn!(error = %e, "mempool filter unavailable, using default fee parameters");
                FeeParams::default()
            }
        }
    }

    /// POST the signed bytes to one endpoint.
    async fn inject(&self, base: &str, hex_body: &str) -> Result<OperationHash, InjectFailure> {
        let url = format!("{}/injection/operation?chain={}", base, self.chain);
        let response = match self.client.post(&url).json(&hex_body).send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() => return Err(InjectFailure::NotSent(e.to_string())),
            Err(e) => return Err(InjectFailure::Failed(ChainError::AmbiguousBroadcast(e.to_string()))),
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InjectFailure::Failed(ChainError::AmbiguousBroadcast(e.to_string())))?;

        if status.is_success() {
            return serde_json::from_str::<String>(&body)
                .ok()
                .and_then(|raw| raw.parse().ok())
                .ok_or_else(|| {
                    InjectFailure::Failed(ChainError::AmbiguousBroadcast(format!(
                        "unreadable injection response: {}",
                        body.trim()
                    )))
                });
        }

        let is_error_array = serde_json::from_str::<Vec<NodeError>>(&body).is_ok();
        if status.is_server_error() && !is_error_array {
            return Err(InjectFailure::Failed(ChainError::AmbiguousBroadcast(format!(
                "{status}: {}",
                body.trim()
            ))));
        }
        Err(InjectFailure::Failed(ChainError::Rejected {
            reason: rejection_reason(&body),
        }))
    }
}

enum InjectFailure {
    /// The request never left this process.
    NotSent(String),
    Failed(ChainError),
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn resolve_chain_id(&self) -> ChainResult<ChainId> {
        self.chain_id
            .get_or_try_init(|| self.fetch_chain_id())
            .await
            .copied()
    }

    async fn complete(
        &self,
        operation: RevealOperation,
        policy: &FeePolicy,
    ) -> ChainResult<UnsignedOperation> {
        self.resolve_chain_id().await?;

        let source = *operation.source();
        let branch = self.branch().await?;
        let protocol = self.protocol().await?;
        self.ensure_unrevealed(&source).await?;
        let counter = self.next_counter(&source).await?;

        let mut unsigned = UnsignedOperation::new(branch, operation, protocol);
        unsigned.contents.manager.counter = counter;

        let params = match policy {
            FeePolicy::Minimum => self.fee_params().await,
            FeePolicy::Fixed(_) => FeeParams::default(),
        };
        let fee = apply_policy(&mut unsigned, policy, &params, self.max_fee)?;

        tracing::info!(
            source = %source,
            branch = %branch,
            counter,
            fee,
            tags_version = ?protocol.tags_version,
            "operation completed"
        );
        Ok(unsigned)
    }

    async fn broadcast(&self, operation: &SignedOperation) -> ChainResult<OperationHash> {
        self.resolve_chain_id().await?;

        let bytes = operation.encode()?;
        let local_hash = operation.hash()?;
        let hex_body = hex::encode(&bytes);

        for (i, base) in self.endpoints.iter().enumerate() {
            let attempt = bounded(
                self.timeout,
                async { Ok(self.inject(base, &hex_body).await) },
                |d| ChainError::AmbiguousBroadcast(format!("no response after {}s", d.as_secs())),
            )
            .await;

            match attempt {
                Ok(Ok(node_hash)) => {
                    metrics::record_rpc_request("injection", true);
                    if node_hash != local_hash {
                        tracing::warn!(
                            node_hash = %node_hash,
                            local_hash = %local_hash,
                            "node reported a different operation hash"
                        );
                    }
                    tracing::info!(operation_hash = %node_hash, "operation injected");
                    return Ok(node_hash);
                }
                Ok(Err(InjectFailure::NotSent(reason))) => {
                    metrics::record_rpc_request("injection", false);
                    tracing::warn!(provider_idx = i, error = %reason, "could not reach node, trying next endpoint");
                }
                Ok(Err(InjectFailure::Failed(e))) | Err(e) => {
                    metrics::record_rpc_request("injection", false);
                    return Err(e);
                }
            }
        }
        Err(ChainError::NodeUnavailable(
            "no RPC endpoint reachable for injection".into(),
        ))
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoints", &self.endpoints)
            .field("chain", &self.chain)
            .field("timeout_secs", &self.timeout.as_secs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> NodeConfig {
        NodeConfig {
            rpc_url: "http://localhost:8732/".to_string(),
            failover_urls: vec!["not a url".to_string(), "http://backup:8732".to_string()],
            ..NodeConfig::default()
        }
    }

    #[test]
    fn test_invalid_failover_skipped() {
        let client = RpcClient::new(&test_config()).unwrap();
        assert_eq!(
            client.endpoints(),
            &["http://localhost:8732".to_string(), "http://backup:8732".to_string()]
        );
    }

    #[test]
    fn test_invalid_primary_rejected() {
        let config = NodeConfig {
            rpc_url: "localhost".to_string(),
            ..NodeConfig::default()
        };
        assert!(matches!(
            RpcClient::new(&config),
            Err(ChainError::NodeUnavailable(_))
        ));
    }

    #[test]
    fn test_paths() {
        let client = RpcClient::new(&test_config()).unwrap();
        let source: Address = "tz1Qr9uevaimfiPS6X1otehsKrwvZjX7bsyL".parse().unwrap();
        assert_eq!(
            client.contract_path(&source, "counter"),
            "/chains/main/blocks/head/context/contracts/tz1Qr9uevaimfiPS6X1otehsKrwvZjX7bsyL/counter"
        );
        assert_eq!(client.chain_path("chain_id"), "/chains/main/chain_id");
    }

    #[tokio::test]
    async fn test_unreachable_endpoints_fail_over_then_error() {
        let config = NodeConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            failover_urls: vec!["http://127.0.0.1:2".to_string()],
            timeout_secs: 2,
            ..NodeConfig::default()
        };
        let client = RpcClient::new(&config).unwrap();
        let err = client.resolve_chain_id().await.unwrap_err();
        assert!(err.to_string().contains("all RPC endpoints failed"));
    }
}
