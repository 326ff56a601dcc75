//! Scheme registry: signature type -> (lengths, verifier).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::constants::signature_ids;
use crate::signing::ed25519::Ed25519Verifier;
use crate::signing::types::{SchemeInfo, SignatureVerifier};
use crate::types::{BundleError, Result};

/// Built-in layout metadata for the well-known signature types.
pub fn builtin_info(signature_type: u16) -> Option<SchemeInfo> {
    match signature_type {
        x if x == signature_ids::ARWEAVE =>
            Some(SchemeInfo { signature_type: x, name: "arweave", signature_length: 512, owner_length: 512 }),
        x if x == signature_ids::ED25519 =>
            Some(SchemeInfo { signature_type: x, name: "ed25519", signature_length: 64, owner_length: 32 }),
        x if x == signature_ids::ETHEREUM =>
            Some(SchemeInfo { signature_type: x, name: "ethereum", signature_length: 65, owner_length: 65 }),
        x if x == signature_ids::SOLANA =>
            Some(SchemeInfo { signature_type: x, name: "solana", signature_length: 64, owner_length: 32 }),
        _ => None,
    }
}

struct SchemeEntry {
    info: SchemeInfo,
    verifier: Option<Arc<dyn SignatureVerifier>>,
}

/// Maps a signature type code to its layout metadata and verify function.
///
/// Schemes without a verifier can still be parsed; their items never verify.
pub struct SchemeRegistry {
    entries: HashMap<u16, SchemeEntry>,
}

impl Default for SchemeRegistry {
    /// All built-in layouts; verifiers for the Ed25519-based schemes.
    fn default() -> Self {
        let mut registry = Self::empty();
        let ed25519: Arc<dyn SignatureVerifier> = Arc::new(Ed25519Verifier);
        for id in [signature_ids::ARWEAVE, signature_ids::ED25519, signature_ids::ETHEREUM, signature_ids::SOLANA] {
            if let Some(info) = builtin_info(id) {
                let verifier = match id {
                    signature_ids::ED25519 | signature_ids::SOLANA => Some(ed25519.clone()),
                    _ => None,
                };
                registry.register(info, verifier);
            }
        }
        registry
    }
}

impl fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut infos: Vec<_> = self.entries.values().map(|e| (e.info, e.verifier.is_some())).collect();
        infos.sort_by_key(|(info, _)| info.signature_type);
        f.debug_struct("SchemeRegistry").field("schemes", &infos).finish()
    }
}

impl SchemeRegistry {
    pub fn empty() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Process-wide default registry.
    pub fn shared() -> Arc<SchemeRegistry> {
        static SHARED: OnceLock<Arc<SchemeRegistry>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(SchemeRegistry::default())).clone()
    }

    /// Add or replace a scheme. Returns the previous metadata, if any.
    pub fn register(
        &mut self,
        info: SchemeInfo,
        verifier: Option<Arc<dyn SignatureVerifier>>,
    ) -> Option<SchemeInfo> {
        debug!(signature_type = info.signature_type, name = info.name, "registering signature scheme");
        self.entries
            .insert(info.signature_type, SchemeEntry { info, verifier })
            .map(|old| old.info)
    }

    pub fn resolve(&self, signature_type: u16) -> Result<SchemeInfo> {
        self.entries
            .get(&signature_type)
            .map(|e| e.info)
            .ok_or(BundleError::UnknownSignatureType { raw: signature_type })
    }

    pub fn can_verify(&self, signature_type: u16) -> bool {
        self.entries.get(&signature_type).is_some_and(|e| e.verifier.is_some())
    }

    /// Fails closed: unknown type, no verifier, or bad signature all yield `false`.
    pub fn verify(&self, signature_type: u16, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        match self.entries.get(&signature_type) {
            Some(SchemeEntry { info, verifier: Some(v) }) => {
                signature.len() == info.signature_length
                    && public_key.len() == info.owner_length
                    && v.verify(public_key, message, signature)
            }
            _ => false,
        }
    }
}
