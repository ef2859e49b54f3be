//! Conversions from what a key management service returns (PEM encoded
//! SubjectPublicKeyInfo, DER encoded ECDSA signatures) into wire form.

use ed25519_dalek::pkcs8::DecodePublicKey as _;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::pkcs8::DecodePublicKey as _;

use crate::signer::{SignerError, SignerResult};
use crate::tezos::{KeyType, PublicKey};

/// Parse a PEM public key of the given scheme into its wire form.
///
/// ECDSA keys are compressed to 33 bytes.
pub fn public_key_from_pem(key_type: KeyType, pem: &str) -> SignerResult<PublicKey> {
    let bytes = match key_type {
        KeyType::Ed25519 => ed25519_dalek::VerifyingKey::from_public_key_pem(pem)
            .map_err(|e| SignerError::InvalidKey(format!("ed25519 pem: {e}")))?
            .to_bytes()
            .to_vec(),
        KeyType::Secp256k1 => k256::PublicKey::from_public_key_pem(pem)
            .map_err(|e| SignerError::InvalidKey(format!("secp256k1 pem: {e}")))?
            .to_encoded_point(true)
            .as_bytes()
            .to_vec(),
        KeyType::P256 => p256::PublicKey::from_public_key_pem(pem)
            .map_err(|e| SignerError::InvalidKey(format!("p256 pem: {e}")))?
            .to_encoded_point(true)
            .as_bytes()
            .to_vec(),
        KeyType::Bls12_381 => {
            return Err(SignerError::InvalidKey(
                "bls12_381 keys are not supported by the remote signer".into(),
            ))
        }
    };
    Ok(PublicKey::new(key_type, bytes)?)
}

/// Convert a raw signature from the service into the 64-byte wire layout.
///
/// Ed25519 signatures pass through. ECDSA signatures arrive DER encoded and
/// become `r ‖ s`; secp256k1 signatures are normalized to low S.
pub fn signature_to_wire(key_type: KeyType, raw: &[u8]) -> SignerResult<Vec<u8>> {
    match key_type {
        KeyType::Ed25519 => {
            if raw.len() != key_type.signature_len() {
                return Err(SignerError::InvalidSignature(format!(
                    "expected {} bytes, got {}",
                    key_type.signature_len(),
                    raw.len()
                )));
            }
            Ok(raw.to_vec())
        }
        KeyType::Secp256k1 => {
            let sig = k256::ecdsa::Signature::from_der(raw)
                .map_err(|e| SignerError::InvalidSignature(format!("secp256k1 der: {e}")))?;
            let sig = sig.normalize_s().unwrap_or(sig);
            Ok(sig.to_bytes().to_vec())
        }
        KeyType::P256 => {
            let sig = p256::ecdsa::Signature::from_der(raw)
                .map_err(|e| SignerError::InvalidSignature(format!("p256 der: {e}")))?;
            Ok(sig.to_bytes().to_vec())
        }
        KeyType::Bls12_381 => Err(SignerError::InvalidSignature(
            "bls12_381 signatures are not supported".into(),
        )),
    }
}
