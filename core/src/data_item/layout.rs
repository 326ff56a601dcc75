//! Offset arithmetic shared by the in-memory and file-backed items.
//!
//! Every region start is a function of the fixed-width fields before it, so
//! an accessor only needs to read those fields to find its own range.

use crate::codec::bytes_to_uint;
use crate::constants::{
    ANCHOR_LEN, FLAG_PRESENT, SIGNATURE_TYPE_LEN, TAG_BYTES_LEN, TAG_COUNT_LEN, TARGET_LEN,
};
use crate::signing::SchemeInfo;
use crate::types::{BundleError, Result};

/// Signature always starts right after the type code.
pub const SIGNATURE_START: u64 = SIGNATURE_TYPE_LEN as u64;

/// Width of the tag-count + tag-bytes-length pair.
pub const TAG_HEADER_LEN: u64 = (TAG_COUNT_LEN + TAG_BYTES_LEN) as u64;

#[inline]
pub fn owner_start(info: &SchemeInfo) -> u64 {
    SIGNATURE_START + info.signature_length as u64
}

/// Offset of the target presence flag.
#[inline]
pub fn target_flag_offset(info: &SchemeInfo) -> u64 {
    owner_start(info) + info.owner_length as u64
}

/// Offset of the anchor presence flag, given the target flag.
#[inline]
pub fn anchor_flag_offset(target_flag_at: u64, target_present: bool) -> u64 {
    target_flag_at + 1 + if target_present { TARGET_LEN as u64 } else { 0 }
}

/// Offset of the tag-count field, given the anchor flag.
#[inline]
pub fn tags_offset(anchor_flag_at: u64, anchor_present: bool) -> u64 {
    anchor_flag_at + 1 + if anchor_present { ANCHOR_LEN as u64 } else { 0 }
}

/// Offset of the payload, given the tag-count field and the tag blob length.
#[inline]
pub fn data_offset(tags_at: u64, tags_len: u64) -> Result<u64> {
    (tags_at + TAG_HEADER_LEN)
        .checked_add(tags_len)
        .ok_or_else(|| BundleError::format(format!("tag bytes length {tags_len} overflows item offsets")))
}

/// Bounds-checked `bytes[offset..offset + need]`.
#[inline]
pub fn region<'a>(bytes: &'a [u8], offset: u64, need: u64, what: &str) -> Result<&'a [u8]> {
    let have = bytes.len() as u64;
    match offset.checked_add(need) {
        Some(end) if end <= have => Ok(&bytes[offset as usize..end as usize]),
        _ => Err(BundleError::out_of_bounds(what, offset, need, have)),
    }
}

#[inline]
pub fn flag_present(flag: u8) -> bool {
    flag == FLAG_PRESENT
}

/// Fully decoded offsets of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLayout {
    pub scheme: SchemeInfo,
    pub target_present: bool,
    pub anchor_present: bool,
    pub tag_count: u64,
    pub tags_len: u64,
}

impl ItemLayout {
    pub fn owner_start(&self) -> u64 {
        owner_start(&self.scheme)
    }

    pub fn target_flag_offset(&self) -> u64 {
        target_flag_offset(&self.scheme)
    }

    pub fn anchor_flag_offset(&self) -> u64 {
        anchor_flag_offset(self.target_flag_offset(), self.target_present)
    }

    pub fn tags_offset(&self) -> u64 {
        tags_offset(self.anchor_flag_offset(), self.anchor_present)
    }

    /// Start of the encoded tag blob.
    pub fn tag_bytes_start(&self) -> u64 {
        self.tags_offset() + TAG_HEADER_LEN
    }

    pub fn data_start(&self) -> Result<u64> {
        data_offset(self.tags_offset(), self.tags_len)
    }

    /// Decode the layout of a complete item buffer and check every region fits.
    pub fn parse(bytes: &[u8], scheme: SchemeInfo) -> Result<Self> {
        let len = bytes.len() as u64;
        let at = |offset: u64, need: u64, what: &str| region(bytes, offset, need, what);

        let target_flag_at = target_flag_offset(&scheme);
        let target_present = flag_present(at(target_flag_at, 1, "target flag")?[0]);
        let anchor_flag_at = anchor_flag_offset(target_flag_at, target_present);
        let anchor_present = flag_present(at(anchor_flag_at, 1, "anchor flag")?[0]);
        let tags_at = tags_offset(anchor_flag_at, anchor_present);

        let tag_count = bytes_to_uint(at(tags_at, TAG_COUNT_LEN as u64, "tag count")?)?;
        let tags_len = bytes_to_uint(at(tags_at + TAG_COUNT_LEN as u64, TAG_BYTES_LEN as u64, "tag bytes length")?)?;

        let layout = Self { scheme, target_present, anchor_present, tag_count, tags_len };
        let data_start = layout.data_start()?;
        if data_start > len {
            return Err(BundleError::out_of_bounds("tags", layout.tag_bytes_start(), tags_len, len));
        }
        Ok(layout)
    }
}
