//! Local verification of signatures returned by the remote signer.

use ed25519_dalek::Verifier as _;
use k256::ecdsa::signature::hazmat::PrehashVerifier;

use crate::signer::{SignerError, SignerResult};
use crate::tezos::{KeyType, PublicKey};

/// Check `signature` (wire layout) over `digest` against `public_key`.
pub fn verify_signature(
    public_key: &PublicKey,
    digest: &[u8; 32],
    signature: &[u8],
) -> SignerResult<()> {
    match public_key.key_type() {
        KeyType::Ed25519 => {
            let key_bytes: [u8; 32] = public_key
                .as_bytes()
                .try_into()
                .map_err(|_| SignerError::InvalidKey("ed25519 key length".into()))?;
            let key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
                .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
            let sig = ed25519_dalek::Signature::from_slice(signature).map_err(invalid)?;
            key.verify(digest, &sig).map_err(invalid)
        }
        KeyType::Secp256k1 => {
            let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key.as_bytes())
                .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
            let sig = k256::ecdsa::Signature::from_slice(signature).map_err(invalid)?;
            key.verify_prehash(digest, &sig).map_err(invalid)
        }
        KeyType::P256 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key.as_bytes())
                .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
            let sig = p256::ecdsa::Signature::from_slice(signature).map_err(invalid)?;
            key.verify_prehash(digest, &sig).map_err(invalid)
        }
        KeyType::Bls12_381 => Err(SignerError::InvalidSignature(
            "bls12_381 verification is not supported".into(),
        )),
    }
}

fn invalid(err: impl std::fmt::Display) -> SignerError {
    SignerError::InvalidSignature(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Signer as _;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::elliptic_curve::sec1::ToEncodedPoint;

    const DIGEST: [u8; 32] = [0x42; 32];

    #[test]
    fn test_ed25519_verifies() {
        let signing = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let key = PublicKey::new(KeyType::Ed25519, signing.verifying_key().to_bytes().to_vec())
            .unwrap();
        let sig = signing.sign(&DIGEST).to_bytes();

        assert!(verify_signature(&key, &DIGEST, &sig).is_ok());

        let mut tampered = sig;
        tampered[0] ^= 1;
        assert!(matches!(
            verify_signature(&key, &DIGEST, &tampered),
            Err(SignerError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_secp256k1_verifies_prehashed_digest() {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let signing = k256::ecdsa::SigningKey::from_slice(&secret).unwrap();
        let compressed = signing.verifying_key().to_encoded_point(true);
        let key = PublicKey::new(KeyType::Secp256k1, compressed.as_bytes().to_vec()).unwrap();

        let sig: k256::ecdsa::Signature = signing.sign_prehash(&DIGEST).unwrap();
        assert!(verify_signature(&key, &DIGEST, &sig.to_bytes()).is_ok());
        assert!(verify_signature(&key, &[0u8; 32], &sig.to_bytes()).is_err());
    }

    #[test]
    fn test_wrong_length_signature_rejected() {
        let signing = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let key = PublicKey::new(KeyType::Ed25519, signing.verifying_key().to_bytes().to_vec())
            .unwrap();
        assert!(verify_signature(&key, &DIGEST, &[0u8; 10]).is_err());
    }
}
