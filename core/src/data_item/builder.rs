//! Item construction: layout prefix encoding and the in-memory builder.
//!
//! The prefix (everything before the payload) is small and always built in
//! memory; the payload is appended by the caller's sink, which lets the
//! file-backed builder stream it.

use std::sync::Arc;

use tracing::debug;

use crate::codec::{counter_bytes, signature_type_bytes};
use crate::constants::{ANCHOR_LEN, FLAG_ABSENT, FLAG_PRESENT, TARGET_LEN};
use crate::data_item::item::DataItem;
use crate::signing::{SchemeRegistry, Signer};
use crate::tags::{encode_tags, Tag, TagCodec};
use crate::types::{BundleError, Result};
use crate::utils::decode_id;

/// Optional fields of a new item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataItemOptions {
    /// Must be exactly 32 bytes when present.
    pub target: Option<Vec<u8>>,
    /// Must be exactly 32 bytes when present.
    pub anchor: Option<Vec<u8>>,
    pub tags: Vec<Tag>,
}

impl DataItemOptions {
    pub fn with_target(mut self, target: impl Into<Vec<u8>>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Target given as a base64url item/transaction id.
    pub fn with_target_id(self, id: &str) -> Result<Self> {
        Ok(self.with_target(decode_id(id)?.to_vec()))
    }

    pub fn with_anchor(mut self, anchor: impl Into<Vec<u8>>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }
}

/// Check the signer against the registry layout for its signature type.
pub fn check_signer(registry: &SchemeRegistry, signer: &dyn Signer) -> Result<()> {
    let scheme = registry.resolve(signer.signature_type())?;
    if signer.signature_length() != scheme.signature_length {
        return Err(BundleError::SignerMismatch {
            signature_type: scheme.signature_type,
            expected: format!("{} signature bytes", scheme.signature_length),
            actual: format!("{} signature bytes", signer.signature_length()),
        });
    }
    if signer.owner_length() != scheme.owner_length {
        return Err(BundleError::SignerMismatch {
            signature_type: scheme.signature_type,
            expected: format!("{} owner bytes", scheme.owner_length),
            actual: format!("{} owner bytes", signer.owner_length()),
        });
    }
    Ok(())
}

fn check_len(field: &'static str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() != expected {
        return Err(BundleError::SizeMismatch { field, expected, actual: bytes.len() });
    }
    Ok(())
}

/// Encode every field before the payload, signature zero-filled.
pub fn encode_item_prefix(
    signer: &dyn Signer,
    opts: &DataItemOptions,
    codec: &dyn TagCodec,
) -> Result<Vec<u8>> {
    let owner = signer.public_key();
    check_len("owner", owner, signer.owner_length())?;
    if let Some(target) = &opts.target {
        check_len("target", target, TARGET_LEN)?;
    }
    if let Some(anchor) = &opts.anchor {
        check_len("anchor", anchor, ANCHOR_LEN)?;
    }
    let tags = encode_tags(codec, &opts.tags)?;

    let mut out = Vec::with_capacity(
        2 + signer.signature_length() + owner.len() + 2 + TARGET_LEN + ANCHOR_LEN + 16 + tags.len(),
    );

    out.extend_from_slice(&signature_type_bytes(signer.signature_type()));
    out.resize(out.len() + signer.signature_length(), 0);
    out.extend_from_slice(owner);

    match &opts.target {
        Some(target) => {
            out.push(FLAG_PRESENT);
            out.extend_from_slice(target);
        }
        None => out.push(FLAG_ABSENT),
    }
    match &opts.anchor {
        Some(anchor) => {
            out.push(FLAG_PRESENT);
            out.extend_from_slice(anchor);
        }
        None => out.push(FLAG_ABSENT),
    }

    out.extend_from_slice(&counter_bytes(opts.tags.len() as u64));
    out.extend_from_slice(&counter_bytes(tags.len() as u64));
    out.extend_from_slice(&tags);
    Ok(out)
}

/// Build an unsigned in-memory item (shared registry).
pub fn create_data(
    data: &[u8],
    signer: &dyn Signer,
    opts: &DataItemOptions,
    codec: &dyn TagCodec,
) -> Result<DataItem> {
    create_data_with_registry(data, signer, opts, codec, SchemeRegistry::shared())
}

pub fn create_data_with_registry(
    data: &[u8],
    signer: &dyn Signer,
    opts: &DataItemOptions,
    codec: &dyn TagCodec,
    registry: Arc<SchemeRegistry>,
) -> Result<DataItem> {
    check_signer(&registry, signer)?;
    let mut buf = encode_item_prefix(signer, opts, codec)?;
    buf.extend_from_slice(data);
    debug!(size = buf.len(), tags = opts.tags.len(), "data item built in memory");
    Ok(DataItem::with_registry(buf, registry))
}
