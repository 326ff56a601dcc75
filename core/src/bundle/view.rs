//! Read side of an in-memory bundle.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::codec::{bytes_to_uint, to_usize};
use crate::constants::{COUNT_LEN, ID_LEN, ROW_LEN};
use crate::bundle::header::{bundle_start, row_offset, HeaderEntry};
use crate::data_item::DataItem;
use crate::signing::SchemeRegistry;
use crate::transport::{add_bundle_tags, Transport};
use crate::types::{BundleError, Result};
use crate::utils::{base64url_encode, decode_id};

/// Location of one item relative to the start of the bodies region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemOffset {
    pub start: u64,
    pub size: u64,
}

/// Bundle over a shared buffer.
///
/// The count and the offset table are checked against the buffer length on
/// construction; item bodies are only touched when an item is requested.
#[derive(Clone)]
pub struct Bundle {
    binary: Bytes,
    registry: Arc<SchemeRegistry>,
    length: usize,
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundle")
            .field("length", &self.length)
            .field("size", &self.binary.len())
            .finish()
    }
}

impl Bundle {
    pub fn new(binary: impl Into<Bytes>) -> Result<Self> {
        Self::with_registry(binary, SchemeRegistry::shared())
    }

    pub fn with_registry(binary: impl Into<Bytes>, registry: Arc<SchemeRegistry>) -> Result<Self> {
        let binary = binary.into();
        if binary.len() < COUNT_LEN {
            return Err(BundleError::out_of_bounds("bundle count", 0, COUNT_LEN as u64, binary.len() as u64));
        }
        let length = to_usize(bytes_to_uint(&binary[..COUNT_LEN])?, "bundle item count")?;
        let start = bundle_start(length)?;
        if start > binary.len() {
            return Err(BundleError::format(format!(
                "offset table for {length} items needs {start} bytes, bundle has {}",
                binary.len()
            )));
        }
        debug!(items = length, bytes = binary.len(), "bundle opened");
        Ok(Self { binary, registry, length })
    }

    /// Number of items declared by the header.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Offset of the first item body: `32 + 64 * length`.
    pub fn bundle_start(&self) -> usize {
        row_offset(self.length)
    }

    pub fn get_raw(&self) -> &Bytes {
        &self.binary
    }

    pub fn registry(&self) -> &Arc<SchemeRegistry> {
        &self.registry
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.length {
            return Err(BundleError::Range { index, length: self.length });
        }
        Ok(())
    }

    /// Row `index` of the offset table.
    pub fn header(&self, index: usize) -> Result<HeaderEntry> {
        self.check_index(index)?;
        let at = row_offset(index);
        HeaderEntry::decode(&self.binary[at..at + ROW_LEN])
    }

    /// Every table row in storage order.
    pub fn headers(&self) -> impl Iterator<Item = Result<HeaderEntry>> + '_ {
        (0..self.length).map(move |i| self.header(i))
    }

    pub fn get_sizes(&self) -> Result<Vec<u64>> {
        self.headers().map(|h| h.map(|h| h.size)).collect()
    }

    pub fn get_raw_ids(&self) -> Vec<[u8; ID_LEN]> {
        (0..self.length)
            .map(|i| {
                let at = row_offset(i) + ROW_LEN - ID_LEN;
                let mut id = [0u8; ID_LEN];
                id.copy_from_slice(&self.binary[at..at + ID_LEN]);
                id
            })
            .collect()
    }

    pub fn get_ids(&self) -> Vec<String> {
        self.get_raw_ids().iter().map(|id| base64url_encode(id)).collect()
    }

    pub fn get_id_by(&self, index: usize) -> Result<String> {
        Ok(self.header(index)?.id())
    }

    /// Start (relative to `bundle_start`) and size of the item with `raw_id`.
    pub fn get_offset(&self, raw_id: &[u8; ID_LEN]) -> Result<Option<ItemOffset>> {
        Ok(self.locate(raw_id)?.map(|(_, offset)| offset))
    }

    fn locate(&self, raw_id: &[u8; ID_LEN]) -> Result<Option<(usize, ItemOffset)>> {
        let mut start = 0u64;
        for (index, header) in self.headers().enumerate() {
            let header = header?;
            if &header.raw_id == raw_id {
                return Ok(Some((index, ItemOffset { start, size: header.size })));
            }
            start = start
                .checked_add(header.size)
                .ok_or_else(|| BundleError::format("item sizes overflow"))?;
        }
        Ok(None)
    }

    fn offset_of_index(&self, index: usize) -> Result<ItemOffset> {
        self.check_index(index)?;
        let mut start = 0u64;
        for i in 0..index {
            start = start
                .checked_add(self.header(i)?.size)
                .ok_or_else(|| BundleError::format("item sizes overflow"))?;
        }
        Ok(ItemOffset { start, size: self.header(index)?.size })
    }

    fn item_at(&self, offset: ItemOffset, raw_id: [u8; ID_LEN]) -> Result<DataItem> {
        let body_len = self.body_len();
        let end = offset
            .start
            .checked_add(offset.size)
            .filter(|end| *end <= body_len)
            .ok_or_else(|| {
                BundleError::out_of_bounds("bundle item", offset.start, offset.size, body_len.saturating_sub(offset.start))
            })?;
        let base = self.bundle_start();
        let slice = self.binary.slice(base + offset.start as usize..base + end as usize);
        Ok(DataItem::with_registry(slice, self.registry.clone()).with_raw_id(raw_id))
    }

    /// Item at table position `index`, seeded with the table id.
    pub fn get_by_index(&self, index: usize) -> Result<DataItem> {
        let offset = self.offset_of_index(index)?;
        self.item_at(offset, self.header(index)?.raw_id)
    }

    pub fn get_by_id(&self, id: &str) -> Result<DataItem> {
        let not_found = || BundleError::NotFound { id: id.to_string() };
        let raw_id = decode_id(id).map_err(|_| not_found())?;
        match self.locate(&raw_id)? {
            Some((_, offset)) => self.item_at(offset, raw_id),
            None => Err(not_found()),
        }
    }

    /// Items in table order, one running offset for the whole pass.
    pub fn items(&self) -> BundleItems<'_> {
        BundleItems { bundle: self, index: 0, start: 0 }
    }

    pub fn get_items(&self) -> Result<Vec<DataItem>> {
        self.items().collect()
    }

    /// `true` iff every item verifies and its signature id matches its row.
    ///
    /// Stops at the first failure. Structural errors count as failure.
    pub fn verify(&self) -> bool {
        for (index, item) in self.items().enumerate() {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    warn!(index, error = %e, "bundle item unreadable");
                    return false;
                }
            };
            if !item.is_valid() {
                debug!(index, "bundle item signature invalid");
                return false;
            }
            let expected = match self.header(index) {
                Ok(h) => h.raw_id,
                Err(_) => return false,
            };
            match item.signature_raw_id() {
                Ok(actual) if actual == expected => {}
                _ => {
                    debug!(index, id = %base64url_encode(&expected), "bundle item id does not match its signature");
                    return false;
                }
            }
        }
        self.sizes_cover_body()
    }

    /// Bytes after the table, i.e. the concatenated item bodies.
    pub fn body_len(&self) -> u64 {
        (self.binary.len() - self.bundle_start()) as u64
    }

    /// `true` iff the table sizes add up to exactly the body region.
    fn sizes_cover_body(&self) -> bool {
        let total = self
            .headers()
            .try_fold(0u64, |acc, h| acc.checked_add(h.ok()?.size));
        match total {
            Some(total) if total == self.body_len() => true,
            total => {
                warn!(sizes = ?total, body = self.body_len(), "bundle table sizes do not match body length");
                false
            }
        }
    }

    /// Hand the whole buffer to `transport` and tag the transaction.
    pub async fn to_transaction<T: Transport>(&self, transport: &T, key: &T::Key) -> Result<T::Tx> {
        let mut tx = transport.create_transaction(self.binary.clone(), key).await?;
        add_bundle_tags(&mut tx);
        Ok(tx)
    }
}

/// Iterator returned by [`Bundle::items`].
pub struct BundleItems<'a> {
    bundle: &'a Bundle,
    index: usize,
    start: u64,
}

impl Iterator for BundleItems<'_> {
    type Item = Result<DataItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.bundle.length {
            return None;
        }
        let index = self.index;
        self.index += 1;
        let result = self.bundle.header(index).and_then(|header| {
            let offset = ItemOffset { start: self.start, size: header.size };
            self.start = self
                .start
                .checked_add(header.size)
                .ok_or_else(|| BundleError::format("item sizes overflow"))?;
            self.bundle.item_at(offset, header.raw_id)
        });
        if result.is_err() {
            // later offsets are meaningless once one row is broken
            self.index = self.bundle.length;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.bundle.length - self.index;
        (0, Some(left))
    }
}
