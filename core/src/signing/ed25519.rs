//! Ed25519 scheme backed by `ed25519-dalek` (also used by the Solana type).

use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use ed25519_dalek::Signer as _;
use ed25519_dalek::Verifier as _;

use crate::constants::signature_ids;
use crate::signing::types::{SignatureVerifier, Signer};
use crate::types::Result;

pub const ED25519_SIGNATURE_LEN: usize = 64;
pub const ED25519_OWNER_LEN: usize = 32;

/// In-process Ed25519 signer.
pub struct Ed25519Signer {
    key: SigningKey,
    public_key: [u8; ED25519_OWNER_LEN],
    signature_type: u16,
}

impl Ed25519Signer {
    pub fn new(key: SigningKey) -> Self {
        let public_key = key.verifying_key().to_bytes();
        Self { key, public_key, signature_type: signature_ids::ED25519 }
    }

    /// Deterministic key from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(seed))
    }

    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Same key, tagged with the Solana signature type.
    pub fn into_solana(mut self) -> Self {
        self.signature_type = signature_ids::SOLANA;
        self
    }
}

impl Signer for Ed25519Signer {
    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn signature_type(&self) -> u16 {
        self.signature_type
    }

    fn signature_length(&self) -> usize {
        ED25519_SIGNATURE_LEN
    }

    fn owner_length(&self) -> usize {
        ED25519_OWNER_LEN
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

/// Stateless Ed25519 verify.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(pk) = <[u8; ED25519_OWNER_LEN]>::try_from(public_key) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&pk) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &sig).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let signer = Ed25519Signer::from_seed(&[3u8; 32]);
        let sig = signer.sign(b"hello").unwrap();
        assert_eq!(sig.len(), ED25519_SIGNATURE_LEN);
        assert!(Ed25519Verifier.verify(signer.public_key(), b"hello", &sig));
        assert!(!Ed25519Verifier.verify(signer.public_key(), b"tampered", &sig));
    }

    #[test]
    fn malformed_inputs_return_false() {
        assert!(!Ed25519Verifier.verify(&[0u8; 31], b"m", &[0u8; 64]));
        assert!(!Ed25519Verifier.verify(&[0u8; 32], b"m", &[0u8; 63]));
    }

    #[test]
    fn solana_variant_keeps_key() {
        let a = Ed25519Signer::from_seed(&[5u8; 32]);
        let pk = a.public_key().to_vec();
        let b = a.into_solana();
        assert_eq!(b.signature_type(), signature_ids::SOLANA);
        assert_eq!(b.public_key(), pk.as_slice());
    }
}
