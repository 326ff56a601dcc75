//! In-memory data item over a shared, sliceable buffer.
//!
//! Construction never validates: each accessor reads only the fixed-width
//! fields preceding its region and fails with `BundleError::Format` if the
//! buffer is too short. Views returned as `Bytes` share the backing buffer.

use std::fmt;
use std::sync::{Arc, OnceLock};

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::{bytes_to_uint, read_signature_type};
use crate::constants::{ANCHOR_LEN, ID_LEN, TAG_BYTES_LEN, TAG_COUNT_LEN, TARGET_LEN};
use crate::crypto::{raw_id_for_signature, DeepHash, SignatureDataBuilder};
use crate::data_item::layout::{
    anchor_flag_offset, data_offset, flag_present, owner_start, region, tags_offset,
    target_flag_offset, ItemLayout, SIGNATURE_START,
};
use crate::signing::{SchemeInfo, SchemeRegistry, Signer};
use crate::tags::{decode_tags, Tag, TagCodec};
use crate::types::{BundleError, Result};
use crate::utils::{base64url_encode, fmt_bytes};

pub struct DataItem {
    binary: Bytes,
    registry: Arc<SchemeRegistry>,
    /// Id handed in from outside (e.g. a bundle's offset table).
    seeded_id: Option<[u8; ID_LEN]>,
    /// Id derived from the signature bytes, once computed.
    signature_id: OnceLock<[u8; ID_LEN]>,
}

impl fmt::Debug for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataItem")
            .field("size", &self.binary.len())
            .field("seeded_id", &self.seeded_id.map(|id| base64url_encode(&id)))
            .finish()
    }
}

impl Clone for DataItem {
    fn clone(&self) -> Self {
        let signature_id = OnceLock::new();
        if let Some(id) = self.signature_id.get() {
            let _ = signature_id.set(*id);
        }
        Self {
            binary: self.binary.clone(),
            registry: self.registry.clone(),
            seeded_id: self.seeded_id,
            signature_id,
        }
    }
}

impl DataItem {
    /// Wrap an item buffer; schemes resolve through the shared registry.
    pub fn new(binary: impl Into<Bytes>) -> Self {
        Self::with_registry(binary, SchemeRegistry::shared())
    }

    pub fn with_registry(binary: impl Into<Bytes>, registry: Arc<SchemeRegistry>) -> Self {
        Self {
            binary: binary.into(),
            registry,
            seeded_id: None,
            signature_id: OnceLock::new(),
        }
    }

    /// Seed the id from an external record; used until the signature-derived
    /// id is computed.
    pub fn with_raw_id(mut self, raw_id: [u8; ID_LEN]) -> Self {
        self.seeded_id = Some(raw_id);
        self
    }

    pub fn set_raw_id(&mut self, raw_id: [u8; ID_LEN]) {
        self.seeded_id = Some(raw_id);
    }

    pub fn registry(&self) -> &Arc<SchemeRegistry> {
        &self.registry
    }

    /// Whole item buffer.
    pub fn get_raw(&self) -> &Bytes {
        &self.binary
    }

    pub fn size(&self) -> usize {
        self.binary.len()
    }

    #[inline]
    fn slice(&self, offset: u64, len: u64, what: &str) -> Result<Bytes> {
        region(&self.binary, offset, len, what)?;
        Ok(self.binary.slice(offset as usize..(offset + len) as usize))
    }

    #[inline]
    fn byte_at(&self, offset: u64, what: &str) -> Result<u8> {
        Ok(region(&self.binary, offset, 1, what)?[0])
    }

    // ================= Fixed fields =================

    pub fn signature_type(&self) -> Result<u16> {
        read_signature_type(&self.binary)
    }

    pub fn scheme(&self) -> Result<SchemeInfo> {
        self.registry.resolve(self.signature_type()?)
    }

    pub fn signature_length(&self) -> Result<usize> {
        Ok(self.scheme()?.signature_length)
    }

    pub fn owner_length(&self) -> Result<usize> {
        Ok(self.scheme()?.owner_length)
    }

    pub fn raw_signature(&self) -> Result<Bytes> {
        let scheme = self.scheme()?;
        self.slice(SIGNATURE_START, scheme.signature_length as u64, "signature")
    }

    pub fn signature(&self) -> Result<String> {
        Ok(base64url_encode(&self.raw_signature()?))
    }

    pub fn raw_owner(&self) -> Result<Bytes> {
        let scheme = self.scheme()?;
        self.slice(owner_start(&scheme), scheme.owner_length as u64, "owner")
    }

    pub fn owner(&self) -> Result<String> {
        Ok(base64url_encode(&self.raw_owner()?))
    }

    // ================= Optional fields =================

    /// Offset of the target presence flag.
    pub fn target_start(&self) -> Result<u64> {
        Ok(target_flag_offset(&self.scheme()?))
    }

    pub fn raw_target(&self) -> Result<Option<Bytes>> {
        let flag_at = self.target_start()?;
        if !flag_present(self.byte_at(flag_at, "target flag")?) {
            return Ok(None);
        }
        self.slice(flag_at + 1, TARGET_LEN as u64, "target").map(Some)
    }

    pub fn target(&self) -> Result<Option<String>> {
        Ok(self.raw_target()?.map(|t| base64url_encode(&t)))
    }

    /// Offset of the anchor presence flag.
    pub fn anchor_start(&self) -> Result<u64> {
        let target_at = self.target_start()?;
        let target_present = flag_present(self.byte_at(target_at, "target flag")?);
        Ok(anchor_flag_offset(target_at, target_present))
    }

    pub fn raw_anchor(&self) -> Result<Option<Bytes>> {
        let flag_at = self.anchor_start()?;
        if !flag_present(self.byte_at(flag_at, "anchor flag")?) {
            return Ok(None);
        }
        self.slice(flag_at + 1, ANCHOR_LEN as u64, "anchor").map(Some)
    }

    pub fn anchor(&self) -> Result<Option<String>> {
        Ok(self.raw_anchor()?.map(|a| base64url_encode(&a)))
    }

    // ================= Tags & data =================

    /// Offset of the tag-count field.
    pub fn tags_start(&self) -> Result<u64> {
        let anchor_at = self.anchor_start()?;
        let anchor_present = flag_present(self.byte_at(anchor_at, "anchor flag")?);
        Ok(tags_offset(anchor_at, anchor_present))
    }

    pub fn tag_count(&self) -> Result<u64> {
        let at = self.tags_start()?;
        bytes_to_uint(region(&self.binary, at, TAG_COUNT_LEN as u64, "tag count")?)
    }

    fn tags_len_at(&self, tags_at: u64) -> Result<u64> {
        let field = region(&self.binary, tags_at + TAG_COUNT_LEN as u64, TAG_BYTES_LEN as u64, "tag bytes length")?;
        bytes_to_uint(field)
    }

    pub fn raw_tags(&self) -> Result<Bytes> {
        let at = self.tags_start()?;
        let len = self.tags_len_at(at)?;
        self.slice(at + (TAG_COUNT_LEN + TAG_BYTES_LEN) as u64, len, "tags")
    }

    pub fn tags(&self, codec: &dyn TagCodec) -> Result<Vec<Tag>> {
        decode_tags(codec, &self.raw_tags()?)
    }

    pub fn data_start(&self) -> Result<u64> {
        let at = self.tags_start()?;
        data_offset(at, self.tags_len_at(at)?)
    }

    pub fn raw_data(&self) -> Result<Bytes> {
        let start = self.data_start()?;
        let len = self.binary.len() as u64;
        if start > len {
            return Err(BundleError::out_of_bounds("data", start, 0, len));
        }
        self.slice(start, len - start, "data")
    }

    pub fn data(&self) -> Result<String> {
        Ok(base64url_encode(&self.raw_data()?))
    }

    /// Decode every offset and check each region lies inside the buffer.
    pub fn layout(&self) -> Result<ItemLayout> {
        ItemLayout::parse(&self.binary, self.scheme()?)
    }

    /// `true` iff every region the header describes lies inside the buffer.
    pub fn verify_layout(&self) -> bool {
        match self.layout().and_then(|l| l.data_start()) {
            Ok(data_start) => data_start <= self.binary.len() as u64,
            Err(_) => false,
        }
    }

    // ================= Identity =================

    /// Id derived from the signature bytes (cached).
    pub fn signature_raw_id(&self) -> Result<[u8; ID_LEN]> {
        if let Some(id) = self.signature_id.get() {
            return Ok(*id);
        }
        let id = raw_id_for_signature(&self.raw_signature()?);
        Ok(*self.signature_id.get_or_init(|| id))
    }

    /// Computed id if known, else the seeded id, else computed now.
    pub fn raw_id(&self) -> Result<[u8; ID_LEN]> {
        if let Some(id) = self.signature_id.get() {
            return Ok(*id);
        }
        match self.seeded_id {
            Some(id) => Ok(id),
            None => self.signature_raw_id(),
        }
    }

    pub fn id(&self) -> Result<String> {
        Ok(base64url_encode(&self.raw_id()?))
    }

    // ================= Signing =================

    /// `true` iff the signature region holds a non-zero byte. A malformed
    /// buffer counts as unsigned.
    pub fn is_signed(&self) -> bool {
        self.raw_signature()
            .map(|sig| sig.iter().any(|&b| b != 0))
            .unwrap_or(false)
    }

    /// Deep-hash message the signature covers.
    pub fn signature_data(&self) -> Result<DeepHash> {
        let target = self.raw_target()?;
        let anchor = self.raw_anchor()?;
        let builder = SignatureDataBuilder::new(
            self.signature_type()?,
            &self.raw_owner()?,
            target.as_deref(),
            anchor.as_deref(),
            &self.raw_tags()?,
        );
        Ok(builder.finish(&self.raw_data()?))
    }

    /// Signature check against owner and content; fails closed.
    pub fn is_valid(&self) -> bool {
        if !self.is_signed() {
            return false;
        }
        match self.check_signature() {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "data item could not be verified");
                false
            }
        }
    }

    fn check_signature(&self) -> Result<bool> {
        let message = self.signature_data()?;
        Ok(self.registry.verify(
            self.signature_type()?,
            &self.raw_owner()?,
            &message,
            &self.raw_signature()?,
        ))
    }

    /// Sign in place and return the signature.
    ///
    /// Overwrites any previous signature. The item gets a private copy of
    /// its buffer first, so other views of the old buffer (e.g. the bundle
    /// it was sliced from) are left untouched.
    pub fn sign(&mut self, signer: &dyn Signer) -> Result<Bytes> {
        let scheme = self.scheme()?;
        if signer.signature_type() != scheme.signature_type {
            return Err(BundleError::SignerMismatch {
                signature_type: scheme.signature_type,
                expected: format!("signature type {}", scheme.signature_type),
                actual: format!("signature type {}", signer.signature_type()),
            });
        }

        let message = self.signature_data()?;
        let signature = signer.sign(&message)?;
        if signature.len() != scheme.signature_length {
            return Err(BundleError::SignerMismatch {
                signature_type: scheme.signature_type,
                expected: format!("{} signature bytes", scheme.signature_length),
                actual: format!("{} signature bytes", signature.len()),
            });
        }

        let start = SIGNATURE_START as usize;
        let mut buf = BytesMut::from(&self.binary[..]);
        buf[start..start + signature.len()].copy_from_slice(&signature);
        self.binary = buf.freeze();
        self.signature_id = OnceLock::new();
        let _ = self.signature_id.set(raw_id_for_signature(&signature));
        self.seeded_id = None;

        debug!(signature = %fmt_bytes(&signature), "data item signed");
        self.raw_signature()
    }
}
