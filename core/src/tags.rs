//! tags.rs
//! Name/value tags and the codec contract used to (de)serialize them.
//!
//! The tag blob inside an item is opaque to the layout: only its byte length
//! and the tag count are fixed-width fields. Encoding is supplied by the caller.

use serde::{Deserialize, Serialize};

use crate::types::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for Tag {
    fn from((name, value): (N, V)) -> Self {
        Tag::new(name, value)
    }
}

/// External tag encoder/decoder.
///
/// Implementations report failures as `BundleError::Tags`.
pub trait TagCodec: Send + Sync {
    fn encode(&self, tags: &[Tag]) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Tag>>;
}

/// Decode a raw tag blob; an empty blob is an empty tag list without
/// consulting the codec.
pub fn decode_tags(codec: &dyn TagCodec, raw: &[u8]) -> Result<Vec<Tag>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    codec.decode(raw)
}

/// Encode tags; no tags encode to an empty blob.
pub fn encode_tags(codec: &dyn TagCodec, tags: &[Tag]) -> Result<Vec<u8>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }
    codec.encode(tags)
}
