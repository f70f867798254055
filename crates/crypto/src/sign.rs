// Path: crates/crypto/src/sign.rs
//! Ed25519 verification.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use jam_types::error::CryptoError;
use jam_types::{Ed25519Key, Ed25519Signature};

/// Verifies an Ed25519 signature over a domain-tagged message.
///
/// The signed payload is `domain ++ message`; the tag keeps signatures from
/// one protocol role unusable in another.
pub fn verify_ed25519(
    key: &Ed25519Key,
    domain: &[u8],
    message: &[u8],
    signature: &Ed25519Signature,
) -> Result<(), CryptoError> {
    let key = VerifyingKey::from_bytes(key)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let signature = Signature::from_bytes(signature);
    let mut payload = Vec::with_capacity(domain.len() + message.len());
    payload.extend_from_slice(domain);
    payload.extend_from_slice(message);
    key.verify(&payload, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use jam_types::params::domains;
    use rand::rngs::OsRng;

    #[test]
    fn verifies_domain_tagged_signature() {
        let signing = SigningKey::generate(&mut OsRng);
        let key = signing.verifying_key().to_bytes();
        let mut payload = domains::GUARANTEE.to_vec();
        payload.extend_from_slice(b"report hash");
        let sig = signing.sign(&payload).to_bytes();

        assert!(verify_ed25519(&key, domains::GUARANTEE, b"report hash", &sig).is_ok());
        // Same bytes under a different domain must fail.
        assert_eq!(
            verify_ed25519(&key, domains::AVAILABLE, b"report hash", &sig),
            Err(CryptoError::VerificationFailed)
        );
    }
}
