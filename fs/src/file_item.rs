//! File-backed data item.
//!
//! Same field contract as `bundle_core::data_item::DataItem`; every accessor
//! is async, opens the file, reads only the fixed fields that locate its
//! region plus the region itself, and closes the file again.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bundle_core::constants::{ANCHOR_LEN, ID_LEN, SIGNATURE_TYPE_LEN, TAG_BYTES_LEN, TAG_COUNT_LEN, TARGET_LEN};
use bundle_core::crypto::{raw_id_for_signature, BlobHasher, DeepHash, SignatureDataBuilder};
use bundle_core::data_item::layout::{
    anchor_flag_offset, data_offset, flag_present, owner_start, tags_offset, target_flag_offset,
    SIGNATURE_START,
};
use bundle_core::codec::read_signature_type;
use bundle_core::signing::{SchemeInfo, Signer};
use bundle_core::tags::{decode_tags, Tag, TagCodec};
use bundle_core::types::{BundleError, Result};
use bundle_core::utils::{base64url_encode, fmt_bytes};
use bytes::Bytes;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, Take};
use tracing::{debug, warn};

use crate::config::FsConfig;
use crate::io::RegionReader;

pub struct FileDataItem {
    path: PathBuf,
    config: FsConfig,
    seeded_id: Option<[u8; ID_LEN]>,
    signature_id: OnceLock<[u8; ID_LEN]>,
}

impl fmt::Debug for FileDataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDataItem")
            .field("path", &self.path)
            .field("seeded_id", &self.seeded_id.map(|id| base64url_encode(&id)))
            .finish()
    }
}

impl Clone for FileDataItem {
    fn clone(&self) -> Self {
        let signature_id = OnceLock::new();
        if let Some(id) = self.signature_id.get() {
            let _ = signature_id.set(*id);
        }
        Self {
            path: self.path.clone(),
            config: self.config.clone(),
            seeded_id: self.seeded_id,
            signature_id,
        }
    }
}

impl FileDataItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, FsConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, config: FsConfig) -> Self {
        Self {
            path: path.into(),
            config,
            seeded_id: None,
            signature_id: OnceLock::new(),
        }
    }

    pub fn with_raw_id(mut self, raw_id: [u8; ID_LEN]) -> Self {
        self.seeded_id = Some(raw_id);
        self
    }

    pub fn set_raw_id(&mut self, raw_id: [u8; ID_LEN]) {
        self.seeded_id = Some(raw_id);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    async fn open(&self) -> Result<RegionReader> {
        RegionReader::open(&self.path).await
    }

    pub async fn size(&self) -> Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    // ================= Offset derivation (one open handle) =================

    async fn scheme_in(&self, r: &mut RegionReader) -> Result<SchemeInfo> {
        let raw = r.read(0, SIGNATURE_TYPE_LEN as u64, "signature type").await?;
        self.config.registry.resolve(read_signature_type(&raw)?)
    }

    async fn anchor_start_in(&self, r: &mut RegionReader) -> Result<u64> {
        let target_at = target_flag_offset(&self.scheme_in(r).await?);
        let present = flag_present(r.byte(target_at, "target flag").await?);
        Ok(anchor_flag_offset(target_at, present))
    }

    async fn tags_start_in(&self, r: &mut RegionReader) -> Result<u64> {
        let anchor_at = self.anchor_start_in(r).await?;
        let present = flag_present(r.byte(anchor_at, "anchor flag").await?);
        Ok(tags_offset(anchor_at, present))
    }

    async fn tags_len_in(r: &mut RegionReader, tags_at: u64) -> Result<u64> {
        r.uint(tags_at + TAG_COUNT_LEN as u64, TAG_BYTES_LEN, "tag bytes length").await
    }

    async fn data_start_in(&self, r: &mut RegionReader) -> Result<u64> {
        let tags_at = self.tags_start_in(r).await?;
        data_offset(tags_at, Self::tags_len_in(r, tags_at).await?)
    }

    async fn optional_in(r: &mut RegionReader, flag_at: u64, len: usize, what: &str) -> Result<Option<Bytes>> {
        if !flag_present(r.byte(flag_at, what).await?) {
            return Ok(None);
        }
        r.read(flag_at + 1, len as u64, what).await.map(Some)
    }

    // ================= Fixed fields =================

    pub async fn signature_type(&self) -> Result<u16> {
        Ok(self.scheme().await?.signature_type)
    }

    pub async fn scheme(&self) -> Result<SchemeInfo> {
        let mut r = self.open().await?;
        self.scheme_in(&mut r).await
    }

    pub async fn signature_length(&self) -> Result<usize> {
        Ok(self.scheme().await?.signature_length)
    }

    pub async fn owner_length(&self) -> Result<usize> {
        Ok(self.scheme().await?.owner_length)
    }

    pub async fn raw_signature(&self) -> Result<Bytes> {
        let mut r = self.open().await?;
        let scheme = self.scheme_in(&mut r).await?;
        r.read(SIGNATURE_START, scheme.signature_length as u64, "signature").await
    }

    pub async fn signature(&self) -> Result<String> {
        Ok(base64url_encode(&self.raw_signature().await?))
    }

    pub async fn raw_owner(&self) -> Result<Bytes> {
        let mut r = self.open().await?;
        let scheme = self.scheme_in(&mut r).await?;
        r.read(owner_start(&scheme), scheme.owner_length as u64, "owner").await
    }

    pub async fn owner(&self) -> Result<String> {
        Ok(base64url_encode(&self.raw_owner().await?))
    }

    // ================= Optional fields =================

    /// Offset of the target presence flag.
    pub async fn target_start(&self) -> Result<u64> {
        Ok(target_flag_offset(&self.scheme().await?))
    }

    pub async fn raw_target(&self) -> Result<Option<Bytes>> {
        let mut r = self.open().await?;
        let at = target_flag_offset(&self.scheme_in(&mut r).await?);
        Self::optional_in(&mut r, at, TARGET_LEN, "target").await
    }

    pub async fn target(&self) -> Result<Option<String>> {
        Ok(self.raw_target().await?.map(|t| base64url_encode(&t)))
    }

    /// Offset of the anchor presence flag.
    pub async fn anchor_start(&self) -> Result<u64> {
        let mut r = self.open().await?;
        self.anchor_start_in(&mut r).await
    }

    pub async fn raw_anchor(&self) -> Result<Option<Bytes>> {
        let mut r = self.open().await?;
        let at = self.anchor_start_in(&mut r).await?;
        Self::optional_in(&mut r, at, ANCHOR_LEN, "anchor").await
    }

    pub async fn anchor(&self) -> Result<Option<String>> {
        Ok(self.raw_anchor().await?.map(|a| base64url_encode(&a)))
    }

    // ================= Tags & data =================

    /// Offset of the tag-count field.
    pub async fn tags_start(&self) -> Result<u64> {
        let mut r = self.open().await?;
        self.tags_start_in(&mut r).await
    }

    pub async fn tag_count(&self) -> Result<u64> {
        let mut r = self.open().await?;
        let at = self.tags_start_in(&mut r).await?;
        r.uint(at, TAG_COUNT_LEN, "tag count").await
    }

    pub async fn raw_tags(&self) -> Result<Bytes> {
        let mut r = self.open().await?;
        let at = self.tags_start_in(&mut r).await?;
        let len = Self::tags_len_in(&mut r, at).await?;
        r.read(at + (TAG_COUNT_LEN + TAG_BYTES_LEN) as u64, len, "tags").await
    }

    pub async fn tags(&self, codec: &dyn TagCodec) -> Result<Vec<Tag>> {
        decode_tags(codec, &self.raw_tags().await?)
    }

    pub async fn data_start(&self) -> Result<u64> {
        let mut r = self.open().await?;
        self.data_start_in(&mut r).await
    }

    /// Whole payload in memory. Prefer `data_reader` for large items.
    pub async fn raw_data(&self) -> Result<Bytes> {
        let mut r = self.open().await?;
        let start = self.data_start_in(&mut r).await?;
        let len = r.len();
        if start > len {
            return Err(BundleError::out_of_bounds("data", start, 0, len));
        }
        r.read(start, len - start, "data").await
    }

    pub async fn data(&self) -> Result<String> {
        Ok(base64url_encode(&self.raw_data().await?))
    }

    /// Reader bounded to the payload region; owns its own handle.
    pub async fn data_reader(&self) -> Result<Take<File>> {
        let start = self.data_start().await?;
        let mut file = File::open(&self.path).await?;
        let len = file.metadata().await?.len();
        if start > len {
            return Err(BundleError::out_of_bounds("data", start, 0, len));
        }
        file.seek(SeekFrom::Start(start)).await?;
        Ok(file.take(len - start))
    }

    // ================= Identity =================

    pub async fn signature_raw_id(&self) -> Result<[u8; ID_LEN]> {
        if let Some(id) = self.signature_id.get() {
            return Ok(*id);
        }
        let id = raw_id_for_signature(&self.raw_signature().await?);
        Ok(*self.signature_id.get_or_init(|| id))
    }

    /// Computed id if known, else the seeded id, else computed now.
    pub async fn raw_id(&self) -> Result<[u8; ID_LEN]> {
        if let Some(id) = self.signature_id.get() {
            return Ok(*id);
        }
        match self.seeded_id {
            Some(id) => Ok(id),
            None => self.signature_raw_id().await,
        }
    }

    pub async fn id(&self) -> Result<String> {
        Ok(base64url_encode(&self.raw_id().await?))
    }

    // ================= Signing =================

    pub async fn is_signed(&self) -> bool {
        match self.raw_signature().await {
            Ok(sig) => sig.iter().any(|&b| b != 0),
            Err(_) => false,
        }
    }

    /// Deep-hash message, payload hashed chunk by chunk.
    pub async fn signature_data(&self) -> Result<DeepHash> {
        let mut r = self.open().await?;
        signature_data_in(&mut r, &self.config).await
    }

    pub async fn is_valid(&self) -> bool {
        Self::verify(&self.path, &self.config).await
    }

    /// Verify the item at `path` without building an item handle.
    pub async fn verify(path: &Path, config: &FsConfig) -> bool {
        match verify_in(path, config).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "file data item could not be verified");
                false
            }
        }
    }

    /// Sign and write the signature into the file at its fixed offset.
    pub async fn sign(&mut self, signer: &dyn Signer) -> Result<Bytes> {
        let scheme = self.scheme().await?;
        if signer.signature_type() != scheme.signature_type {
            return Err(BundleError::SignerMismatch {
                signature_type: scheme.signature_type,
                expected: format!("signature type {}", scheme.signature_type),
                actual: format!("signature type {}", signer.signature_type()),
            });
        }

        let message = self.signature_data().await?;
        let signature = signer.sign(&message)?;
        if signature.len() != scheme.signature_length {
            return Err(BundleError::SignerMismatch {
                signature_type: scheme.signature_type,
                expected: format!("{} signature bytes", scheme.signature_length),
                actual: format!("{} signature bytes", signature.len()),
            });
        }

        let mut file = OpenOptions::new().write(true).open(&self.path).await?;
        file.seek(SeekFrom::Start(SIGNATURE_START)).await?;
        file.write_all(&signature).await?;
        file.flush().await?;
        drop(file);

        self.signature_id = OnceLock::new();
        let _ = self.signature_id.set(raw_id_for_signature(&signature));
        self.seeded_id = None;

        debug!(path = %self.path.display(), signature = %fmt_bytes(&signature), "file data item signed");
        Ok(Bytes::from(signature))
    }
}

async fn signature_data_in(r: &mut RegionReader, config: &FsConfig) -> Result<DeepHash> {
    let raw_type = r.read(0, SIGNATURE_TYPE_LEN as u64, "signature type").await?;
    let scheme = config.registry.resolve(read_signature_type(&raw_type)?)?;

    let owner = r.read(owner_start(&scheme), scheme.owner_length as u64, "owner").await?;
    let target_at = target_flag_offset(&scheme);
    let target = FileDataItem::optional_in(r, target_at, TARGET_LEN, "target").await?;
    let anchor_at = anchor_flag_offset(target_at, target.is_some());
    let anchor = FileDataItem::optional_in(r, anchor_at, ANCHOR_LEN, "anchor").await?;
    let tags_at = tags_offset(anchor_at, anchor.is_some());
    let tags_len = FileDataItem::tags_len_in(r, tags_at).await?;
    let tags = r.read(tags_at + (TAG_COUNT_LEN + TAG_BYTES_LEN) as u64, tags_len, "tags").await?;

    let data_at = data_offset(tags_at, tags_len)?;
    if data_at > r.len() {
        return Err(BundleError::out_of_bounds("data", data_at, 0, r.len()));
    }
    let data_len = r.len() - data_at;
    let mut blob = BlobHasher::new(data_len);
    r.hash_region(data_at, data_len, config.chunk_size, &mut blob).await?;

    let builder = SignatureDataBuilder::new(
        scheme.signature_type,
        &owner,
        target.as_deref(),
        anchor.as_deref(),
        &tags,
    );
    Ok(builder.finish_with(blob))
}

async fn verify_in(path: &Path, config: &FsConfig) -> Result<bool> {
    let mut r = RegionReader::open(path).await?;
    let raw_type = r.read(0, SIGNATURE_TYPE_LEN as u64, "signature type").await?;
    let scheme = config.registry.resolve(read_signature_type(&raw_type)?)?;
    let signature = r.read(SIGNATURE_START, scheme.signature_length as u64, "signature").await?;
    if signature.iter().all(|&b| b == 0) {
        return Ok(false);
    }
    let owner = r.read(owner_start(&scheme), scheme.owner_length as u64, "owner").await?;
    let message = signature_data_in(&mut r, config).await?;
    Ok(config.registry.verify(scheme.signature_type, &owner, &message, &signature))
}
