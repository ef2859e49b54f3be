//! The reveal state machine.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::{ChainClient, ChainError, FeePolicy};
use crate::codec::{RevealOperation, SignedOperation};
use crate::config::FeeConfig;
use crate::lifecycle::{CancelSignal, CancelToken};
use crate::observability::metrics;
use crate::reveal::error::RevealError;
use crate::reveal::state::{RevealStage, RunState};
use crate::signer::verify::verify_signature;
use crate::signer::{KeyHandle, RemoteSigner, SignerError};
use crate::tezos::{Address, OperationHash, Signature};

/// Values a reveal is built with before the node completes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealHints {
    pub fee: u64,
    pub gas_limit: u64,
    pub storage_limit: u64,
}

impl Default for RevealHints {
    fn default() -> Self {
        Self {
            fee: 300,
            gas_limit: 180,
            storage_limit: 0,
        }
    }
}

impl From<&FeeConfig> for RevealHints {
    fn from(config: &FeeConfig) -> Self {
        Self {
            fee: config.fee_hint,
            gas_limit: config.gas_limit,
            storage_limit: config.storage_limit,
        }
    }
}

/// Builds, signs and broadcasts reveal operations.
///
/// The signer and node handles are shared and long-lived. Each workflow owns
/// one [`RunState`] channel that follows whichever run last moved it; runs
/// that need to be observed separately each take a [`RevealWorkflow::split`].
pub struct RevealWorkflow {
    signer: Arc<dyn RemoteSigner>,
    chain: Arc<dyn ChainClient>,
    hints: RevealHints,
    fee_policy: FeePolicy,
    verify_signatures: bool,
    state: watch::Sender<RunState>,
}

impl RevealWorkflow {
    pub fn new(signer: Arc<dyn RemoteSigner>, chain: Arc<dyn ChainClient>) -> Self {
        let (state, _) = watch::channel(RunState::default());
        Self {
            signer,
            chain,
            hints: RevealHints::default(),
            fee_policy: FeePolicy::Minimum,
            verify_signatures: false,
            state,
        }
    }

    pub fn with_hints(mut self, hints: RevealHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_fee_policy(mut self, policy: FeePolicy) -> Self {
        self.fee_policy = policy;
        self
    }

    /// Check every signature locally before it is attached.
    pub fn with_signature_verification(mut self, enabled: bool) -> Self {
        self.verify_signatures = enabled;
        self
    }

    /// State of the most recent run on this workflow. Concurrent runs on
    /// the same workflow interleave here.
    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    /// Follow state transitions of the runs on this workflow as they happen.
    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Same signer, node and settings, with a state channel of its own
    /// starting at `Init`.
    pub fn split(&self) -> Self {
        let (state, _) = watch::channel(RunState::default());
        Self {
            signer: Arc::clone(&self.signer),
            chain: Arc::clone(&self.chain),
            hints: self.hints,
            fee_policy: self.fee_policy,
            verify_signatures: self.verify_signatures,
            state,
        }
    }

    /// Reveal the key behind `key`, returning the injected operation hash.
    pub async fn reveal(
        &self,
        key: &KeyHandle,
        cancel: &CancelToken,
    ) -> Result<OperationHash, RevealError> {
        let span = tracing::info_span!("reveal", run_id = %Uuid::new_v4(), key = %key);
        let result = async {
            let mut signal = cancel.signal();
            let signed = self.run_to_signed(key, &mut signal).await?;
            self.broadcast_signed(signed, cancel).await
        }
        .instrument(span)
        .await;
        self.finish(&result, "success");
        result
    }

    /// Run up to `Signed` without broadcasting.
    pub async fn prepare(
        &self,
        key: &KeyHandle,
        cancel: &CancelToken,
    ) -> Result<SignedOperation, RevealError> {
        let span = tracing::info_span!("prepare", run_id = %Uuid::new_v4(), key = %key);
        let result = async {
            let mut signal = cancel.signal();
            self.run_to_signed(key, &mut signal).await
        }
        .instrument(span)
        .await;
        self.finish(&result, "prepared");
        result
    }

    /// Broadcast an operation signed by an earlier run.
    pub async fn submit(
        &self,
        signed: SignedOperation,
        cancel: &CancelToken,
    ) -> Result<OperationHash, RevealError> {
        let span = tracing::info_span!("submit", run_id = %Uuid::new_v4());
        let result = async {
            self.enter(RevealStage::Signed);
            signed
                .contents()
                .validate()
                .map_err(|e| RevealError::from_codec(RevealStage::Signed, e))?;
            self.broadcast_signed(signed, cancel).await
        }
        .instrument(span)
        .await;
        self.finish(&result, "success");
        result
    }

    /// Address the key behind `key` controls.
    pub async fn resolve_address(&self, key: &KeyHandle) -> Result<Address, RevealError> {
        let public_key = self
            .signer
            .get_public_key(key)
            .await
            .map_err(|e| RevealError::from_signer(RevealStage::Init, e))?;
        Ok(Address::from_public_key(&public_key))
    }

    async fn run_to_signed(
        &self,
        key: &KeyHandle,
        signal: &mut CancelSignal,
    ) -> Result<SignedOperation, RevealError> {
        self.enter(RevealStage::Init);

        let public_key = guard(RevealStage::Init, signal, async {
            self.signer
                .get_public_key(key)
                .await
                .map_err(|e| RevealError::from_signer(RevealStage::Init, e))
        })
        .await?;
        let key_type = public_key.key_type();
        tracing::info!(
            public_key = %public_key,
            source = %Address::from_public_key(&public_key),
            "key resolved"
        );
        self.enter(RevealStage::KeyResolved);

        let operation = RevealOperation::new(
            public_key.clone(),
            self.hints.fee,
            self.hints.gas_limit,
            self.hints.storage_limit,
        );
        self.enter(RevealStage::Built);

        guard(RevealStage::Built, signal, async {
            self.chain
                .resolve_chain_id()
                .await
                .map_err(|e| RevealError::from_chain(RevealStage::Built, e))
        })
        .await?;
        let unsigned = guard(RevealStage::Built, signal, async {
            self.chain
                .complete(operation, &self.fee_policy)
                .await
                .map_err(|e| RevealError::from_chain(RevealStage::Built, e))
        })
        .await?;
        if unsigned.contents.public_key != public_key {
            return Err(RevealError::from_chain(
                RevealStage::Built,
                ChainError::InvalidResponse("completion replaced the revealed key".into()),
            ));
        }
        self.enter(RevealStage::Completed);
        unsigned
            .contents
            .validate()
            .map_err(|e| RevealError::from_codec(RevealStage::Completed, e))?;

        let digest = unsigned
            .digest()
            .map_err(|e| RevealError::from_codec(RevealStage::Completed, e))?;
        tracing::debug!(digest = %hex::encode(digest), "operation digested");
        self.enter(RevealStage::Digested);

        let raw = guard(RevealStage::Digested, signal, async {
            self.signer
                .sign(key, &digest)
                .await
                .map_err(|e| RevealError::from_signer(RevealStage::Digested, e))
        })
        .await?;
        let invalid_signature = |reason: String| {
            RevealError::from_signer(
                RevealStage::Digested,
                SignerError::InvalidSignature(reason),
            )
        };
        let signature =
            Signature::new(key_type, raw).map_err(|e| invalid_signature(e.to_string()))?;
        if self.verify_signatures {
            verify_signature(&public_key, &digest, signature.as_bytes())
                .map_err(|e| RevealError::from_signer(RevealStage::Digested, e))?;
        }
        let signed = unsigned
            .attach_signature(signature)
            .map_err(|e| RevealError::from_codec(RevealStage::Digested, e))?;
        self.enter(RevealStage::Signed);

        Ok(signed)
    }

    /// Injection is not raced against cancellation once started.
    async fn broadcast_signed(
        &self,
        signed: SignedOperation,
        cancel: &CancelToken,
    ) -> Result<OperationHash, RevealError> {
        if cancel.is_cancelled() {
            return Err(RevealError::Cancelled {
                stage: RevealStage::Signed,
                signed: Some(Box::new(signed)),
            });
        }

        let local_hash = signed
            .hash()
            .map_err(|e| RevealError::from_codec(RevealStage::Signed, e))?;
        self.enter(RevealStage::Broadcast);

        let hash = match self.chain.broadcast(&signed).await {
            Ok(hash) => hash,
            Err(source @ ChainError::AmbiguousBroadcast(_)) => {
                return Err(RevealError::AmbiguousBroadcast {
                    operation_hash: local_hash,
                    source,
                })
            }
            Err(e) => return Err(RevealError::from_chain(RevealStage::Broadcast, e)),
        };
        self.enter(RevealStage::Done);
        Ok(hash)
    }

    fn enter(&self, stage: RevealStage) {
        tracing::debug!(stage = %stage, "stage entered");
        self.state.send_replace(RunState::Active(stage));
    }

    fn finish<T>(&self, result: &Result<T, RevealError>, success: &'static str) {
        match result {
            Ok(_) => metrics::record_reveal_run(success),
            Err(e) => {
                tracing::warn!(stage = %e.stage(), kind = e.kind(), error = %e, "reveal run failed");
                self.state.send_replace(RunState::Failed {
                    stage: e.stage(),
                    reason: e.to_string(),
                });
                metrics::record_reveal_run(e.kind());
            }
        }
    }
}

/// Race one step against cancellation. A pending cancellation wins.
async fn guard<T, F>(
    stage: RevealStage,
    signal: &mut CancelSignal,
    step: F,
) -> Result<T, RevealError>
where
    F: Future<Output = Result<T, RevealError>>,
{
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(RevealError::Cancelled { stage, signed: None }),
        result = step => result,
    }
}
