use num_enum::TryFromPrimitive;

use crate::constants::signature_ids;
use crate::types::Result;

/// Known signature schemes (layout registry).
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum SignatureType {
    Arweave  = signature_ids::ARWEAVE,
    Ed25519  = signature_ids::ED25519,
    Ethereum = signature_ids::ETHEREUM,
    Solana   = signature_ids::SOLANA,
}

/// Layout metadata of one signature scheme.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SchemeInfo {
    pub signature_type: u16,
    pub name: &'static str,
    pub signature_length: usize,
    pub owner_length: usize,
}

/// Capability a caller supplies to sign data items.
pub trait Signer: Send + Sync {
    /// Owner bytes written into the item; must be `owner_length()` long.
    fn public_key(&self) -> &[u8];
    fn signature_type(&self) -> u16;
    fn signature_length(&self) -> usize;
    fn owner_length(&self) -> usize;
    /// Sign the deep-hash message of an item.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Stateless verify operation of a scheme.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `false` for any malformed key or signature; never panics.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}
