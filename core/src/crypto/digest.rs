//! crypto/digest.rs
//!
//! Item identity and the deep-hash signing message.
//!
//! Design notes:
//! - Item id = SHA-256 of the raw signature bytes, base64url (no padding).
//! - Signing message = SHA-384 deep hash of the item's fields, signature excluded.
//! - Blobs can be hashed incrementally (`BlobHasher`) so a payload never has
//!   to be held in memory; the blob length is fixed up front.
//!
//! Deep hash (canonical):
//!
//! ```text
//! blob(b) = H( H("blob" || dec(len b)) || H(b) )
//! list(l) = fold(H("list" || dec(len l)), |acc, x| H(acc || deep(x)))
//! ```

use sha2::{Digest as _, Sha256, Sha384};

use crate::constants::{DEEP_HASH_ITEM_KIND, DEEP_HASH_ITEM_VERSION, ID_LEN};
use crate::utils::base64url_encode;

pub const DEEP_HASH_LEN: usize = 48;

pub type DeepHash = [u8; DEEP_HASH_LEN];

#[inline]
fn sha384(parts: &[&[u8]]) -> DeepHash {
    let mut h = Sha384::new();
    for p in parts {
        h.update(p);
    }
    let mut out = [0u8; DEEP_HASH_LEN];
    out.copy_from_slice(&h.finalize());
    out
}

/// Raw 32-byte id of an item with this signature.
pub fn raw_id_for_signature(raw_signature: &[u8]) -> [u8; ID_LEN] {
    let mut out = [0u8; ID_LEN];
    out.copy_from_slice(&Sha256::digest(raw_signature));
    out
}

/// Encoded id of an item with this signature.
pub fn id_for_signature(raw_signature: &[u8]) -> String {
    base64url_encode(&raw_id_for_signature(raw_signature))
}

/// One deep-hash input node.
#[derive(Debug, Clone)]
pub enum DeepHashChunk<'a> {
    Blob(&'a [u8]),
    List(Vec<DeepHashChunk<'a>>),
}

pub fn deep_hash(chunk: &DeepHashChunk<'_>) -> DeepHash {
    match chunk {
        DeepHashChunk::Blob(data) => {
            let mut h = BlobHasher::new(data.len() as u64);
            h.update(data);
            h.finalize()
        }
        DeepHashChunk::List(items) => {
            let mut list = ListHasher::new(items.len());
            for item in items {
                list.push_hash(&deep_hash(item));
            }
            list.finalize()
        }
    }
}

/// Incremental blob hash. The blob length is bound before any byte is fed.
pub struct BlobHasher {
    tag: DeepHash,
    state: Sha384,
    expected: u64,
    seen: u64,
}

impl BlobHasher {
    pub fn new(len: u64) -> Self {
        let tag = sha384(&[b"blob", len.to_string().as_bytes()]);
        Self { tag, state: Sha384::new(), expected: len, seen: 0 }
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.seen += data.len() as u64;
        self.state.update(data);
    }

    pub fn finalize(self) -> DeepHash {
        debug_assert_eq!(self.seen, self.expected, "blob length bound at start was not honoured");
        let mut inner = [0u8; DEEP_HASH_LEN];
        inner.copy_from_slice(&self.state.finalize());
        sha384(&[&self.tag, &inner])
    }
}

/// Incremental list hash; children are pushed as finished deep hashes.
pub struct ListHasher {
    acc: DeepHash,
}

impl ListHasher {
    pub fn new(len: usize) -> Self {
        Self { acc: sha384(&[b"list", len.to_string().as_bytes()]) }
    }

    #[inline]
    pub fn push_hash(&mut self, child: &DeepHash) {
        self.acc = sha384(&[&self.acc, child]);
    }

    #[inline]
    pub fn push_blob(&mut self, blob: &[u8]) {
        self.push_hash(&deep_hash(&DeepHashChunk::Blob(blob)));
    }

    pub fn finalize(self) -> DeepHash {
        self.acc
    }
}

/// Signing message builder for one data item.
///
/// Field order (fixed): kind, version, signature type, owner, target,
/// anchor, raw tags, raw data. Absent target/anchor hash as empty blobs.
pub struct SignatureDataBuilder {
    list: ListHasher,
}

impl SignatureDataBuilder {
    pub const FIELDS: usize = 8;

    pub fn new(
        signature_type: u16,
        owner: &[u8],
        target: Option<&[u8]>,
        anchor: Option<&[u8]>,
        raw_tags: &[u8],
    ) -> Self {
        let mut list = ListHasher::new(Self::FIELDS);
        list.push_blob(DEEP_HASH_ITEM_KIND);
        list.push_blob(DEEP_HASH_ITEM_VERSION);
        list.push_blob(signature_type.to_string().as_bytes());
        list.push_blob(owner);
        list.push_blob(target.unwrap_or_default());
        list.push_blob(anchor.unwrap_or_default());
        list.push_blob(raw_tags);
        Self { list }
    }

    /// Finish with an in-memory payload.
    pub fn finish(self, data: &[u8]) -> DeepHash {
        let mut blob = BlobHasher::new(data.len() as u64);
        blob.update(data);
        self.finish_with(blob)
    }

    /// Finish with a payload hashed incrementally by the caller.
    pub fn finish_with(mut self, data: BlobHasher) -> DeepHash {
        self.list.push_hash(&data.finalize());
        self.list.finalize()
    }
}
