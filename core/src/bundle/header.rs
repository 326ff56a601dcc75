//! Offset-table rows and header encoding.

use crate::codec::{bytes_to_uint, count_bytes};
use crate::constants::{COUNT_LEN, HEADER_START, ID_LEN, ROW_LEN, SIZE_FIELD_LEN};
use crate::types::{BundleError, Result};
use crate::utils::base64url_encode;

/// One offset-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderEntry {
    pub size: u64,
    pub raw_id: [u8; ID_LEN],
}

impl HeaderEntry {
    pub fn id(&self) -> String {
        base64url_encode(&self.raw_id)
    }

    /// Decode a 64-byte row.
    pub fn decode(row: &[u8]) -> Result<Self> {
        if row.len() < ROW_LEN {
            return Err(BundleError::out_of_bounds("offset table row", 0, ROW_LEN as u64, row.len() as u64));
        }
        let size = bytes_to_uint(&row[..SIZE_FIELD_LEN])?;
        let mut raw_id = [0u8; ID_LEN];
        raw_id.copy_from_slice(&row[SIZE_FIELD_LEN..ROW_LEN]);
        Ok(Self { size, raw_id })
    }

    pub fn encode(&self) -> [u8; ROW_LEN] {
        let mut row = [0u8; ROW_LEN];
        row[..8].copy_from_slice(&self.size.to_le_bytes());
        row[SIZE_FIELD_LEN..].copy_from_slice(&self.raw_id);
        row
    }
}

/// Byte offset where item bodies begin for `count` items.
pub fn bundle_start(count: usize) -> Result<usize> {
    count
        .checked_mul(ROW_LEN)
        .and_then(|rows| rows.checked_add(HEADER_START))
        .ok_or_else(|| BundleError::format(format!("item count {count} overflows the offset table")))
}

/// Offset of row `index` in the header.
#[inline]
pub fn row_offset(index: usize) -> usize {
    HEADER_START + ROW_LEN * index
}

/// Encode count + rows, in order.
pub fn encode_header(entries: &[HeaderEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(COUNT_LEN + ROW_LEN * entries.len());
    out.extend_from_slice(&count_bytes(entries.len() as u64));
    for entry in entries {
        out.extend_from_slice(&entry.encode());
    }
    out
}
