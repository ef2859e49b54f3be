//! Key management service adapter.
//!
//! Talks to a Cloud KMS style REST API:
//! - `GET {endpoint}/{handle}/publicKey` → `{ "pem", "algorithm" }`
//! - `POST {endpoint}/{handle}:asymmetricSign` → `{ "signature" }`
//!
//! Ed25519 keys sign the digest as raw data; ECDSA keys receive it as a
//! pre-computed digest, so the service never hashes it again.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::SignerConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::bounded;
use crate::signer::spki::{public_key_from_pem, signature_to_wire};
use crate::signer::{KeyHandle, RemoteSigner, SignerError, SignerResult};
use crate::tezos::{KeyType, PublicKey};

/// Remote signer backed by a key management service.
pub struct KmsSigner {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    timeout: Duration,
    /// Scheme of each key seen so far; signing needs it to shape the request.
    key_types: RwLock<HashMap<KeyHandle, KeyType>>,
}

impl KmsSigner {
    /// Build a signer from configuration, reading the bearer token from the
    /// configured environment variable.
    pub fn new(config: &SignerConfig) -> SignerResult<Self> {
        let access_token = std::env::var(&config.access_token_env)
            .ok()
            .filter(|t| !t.is_empty());
        if access_token.is_none() {
            tracing::debug!(
                env = %config.access_token_env,
                "no KMS access token in environment, sending unauthenticated requests"
            );
        }
        Self::with_token(
            &config.endpoint,
            access_token,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Build a signer with an explicit token.
    pub fn with_token(
        endpoint: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> SignerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignerError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token,
            timeout,
            key_types: RwLock::new(HashMap::new()),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn fetch_public_key(&self, handle: &KeyHandle) -> SignerResult<PublicKey> {
        let url = format!("{}/{}/publicKey", self.endpoint, handle);
        let request = self.authorize(self.client.get(&url));

        let response = request.send().await.map_err(unavailable)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, handle, body, false));
        }

        let body: PublicKeyResponse = response
            .json()
            .await
            .map_err(|e| SignerError::InvalidKey(format!("unreadable response: {e}")))?;
        let key_type = key_type_for_algorithm(&body.algorithm)?;
        let key = public_key_from_pem(key_type, &body.pem)?;

        self.key_types.write().await.insert(handle.clone(), key_type);
        Ok(key)
    }

    async fn key_type(&self, handle: &KeyHandle) -> SignerResult<KeyType> {
        if let Some(key_type) = self.key_types.read().await.get(handle) {
            return Ok(*key_type);
        }
        Ok(self.get_public_key(handle).await?.key_type())
    }

    async fn request_signature(
        &self,
        handle: &KeyHandle,
        key_type: KeyType,
        digest: &[u8; 32],
    ) -> SignerResult<Vec<u8>> {
        let encoded = BASE64.encode(digest);
        let body = match key_type {
            KeyType::Ed25519 => SignRequest {
                data: Some(encoded),
                digest: None,
            },
            _ => SignRequest {
                data: None,
                digest: Some(DigestBody { sha256: encoded }),
            },
        };

        let url = format!("{}/{}:asymmetricSign", self.endpoint, handle);
        let request = self.authorize(self.client.post(&url)).json(&body);

        let response = request.send().await.map_err(unavailable)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, handle, body, true));
        }

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| SignerError::InvalidSignature(format!("unreadable response: {e}")))?;
        let raw = BASE64
            .decode(body.signature.as_bytes())
            .map_err(|e| SignerError::InvalidSignature(format!("base64: {e}")))?;
        signature_to_wire(key_type, &raw)
    }
}

#[async_trait]
impl RemoteSigner for KmsSigner {
    async fn get_public_key(&self, handle: &KeyHandle) -> SignerResult<PublicKey> {
        let result = bounded(self.timeout, self.fetch_public_key(handle), timed_out).await;
        metrics::record_signer_request("public_key", result.is_ok());
        result
    }

    async fn sign(&self, handle: &KeyHandle, digest: &[u8; 32]) -> SignerResult<Vec<u8>> {
        let key_type = self.key_type(handle).await?;
        let result = bounded(
            self.timeout,
            self.request_signature(handle, key_type, digest),
            timed_out,
        )
        .await;
        metrics::record_signer_request("sign", result.is_ok());
        result
    }
}

/// Map a KMS algorithm name to the key type it produces.
pub fn key_type_for_algorithm(algorithm: &str) -> SignerResult<KeyType> {
    match algorithm {
        "EC_SIGN_ED25519" => Ok(KeyType::Ed25519),
        "EC_SIGN_SECP256K1_SHA256" => Ok(KeyType::Secp256k1),
        "EC_SIGN_P256_SHA256" => Ok(KeyType::P256),
        other => Err(SignerError::InvalidKey(format!(
            "unsupported key algorithm {other}"
        ))),
    }
}

fn map_status(status: StatusCode, handle: &KeyHandle, body: String, signing: bool) -> SignerError {
    match status {
        StatusCode::NOT_FOUND => SignerError::KeyNotFound(handle.clone()),
        StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN if signing => {
            SignerError::SignRejected(format!("{status}: {body}"))
        }
        StatusCode::BAD_REQUEST => SignerError::InvalidKey(format!("{status}: {body}")),
        _ => SignerError::Unavailable(format!("{status}: {body}")),
    }
}

fn unavailable(err: reqwest::Error) -> SignerError {
    SignerError::Unavailable(err.to_string())
}

fn timed_out(after: Duration) -> SignerError {
    SignerError::Unavailable(format!("no response after {}s", after.as_secs()))
}

#[derive(Debug, Deserialize)]
struct PublicKeyResponse {
    pem: String,
    algorithm: String,
}

#[derive(Debug, Serialize)]
struct SignRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<DigestBody>,
}

#[derive(Debug, Serialize)]
struct DigestBody {
    sha256: String,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    signature: String,
}
