use std::io;

use crate::signing::SignatureType;
use crate::utils::enum_name_or_hex;

/// Unified error for layout parsing, construction and signing.
/// - Verification failures are not errors; they surface as `false`.
/// - `?` works across codec, signer and I/O calls through the `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// Malformed or short buffer, or an unparsable size/offset field.
    #[error("format error: {0}")]
    Format(String),

    /// Index outside `0..length`.
    #[error("index {index} out of range for bundle of {length} items")]
    Range { index: usize, length: usize },

    /// Id absent from the offset table.
    #[error("data item not found: {id}")]
    NotFound { id: String },

    /// Owner / target / anchor violates its fixed size.
    #[error("{field} must be {expected} bytes, got {actual}")]
    SizeMismatch { field: &'static str, expected: usize, actual: usize },

    /// Signer output disagrees with the scheme of the item.
    #[error("signer mismatch for {}: expected {expected}, got {actual}", enum_name_or_hex::<SignatureType>(*signature_type))]
    SignerMismatch { signature_type: u16, expected: String, actual: String },

    /// Signature type not present in the scheme registry.
    #[error("unknown signature type: {}", enum_name_or_hex::<SignatureType>(*raw))]
    UnknownSignatureType { raw: u16 },

    /// Signing collaborator failed.
    #[error("signer error: {0}")]
    Signer(String),

    /// Tag codec collaborator failed.
    #[error("tag codec error: {0}")]
    Tags(String),

    /// Transport collaborator failed.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BundleError {
    pub fn format(msg: impl Into<String>) -> Self {
        BundleError::Format(msg.into())
    }

    /// Out-of-bounds read of `need` bytes at `offset` in a region of `have` bytes.
    pub fn out_of_bounds(what: &str, offset: u64, need: u64, have: u64) -> Self {
        BundleError::Format(format!(
            "{what}: read of {need} bytes at offset {offset} exceeds length {have}"
        ))
    }
}

pub type Result<T> = std::result::Result<T, BundleError>;
