//! Fixed widths and well-known values of the bundle and data item layouts.
//!
//! All multi-byte integers are little-endian.

/// Width of the bundle item-count field.
pub const COUNT_LEN: usize = 32;

/// Offset of the first offset-table row.
pub const HEADER_START: usize = COUNT_LEN;

/// Width of the per-row item size field.
pub const SIZE_FIELD_LEN: usize = 32;

/// Width of a raw item id (SHA-256 digest of the signature).
pub const ID_LEN: usize = 32;

/// One offset-table row: size + id.
pub const ROW_LEN: usize = SIZE_FIELD_LEN + ID_LEN;

/// Data item: signature-type code width.
pub const SIGNATURE_TYPE_LEN: usize = 2;

/// Data item: optional target / anchor widths (flag byte excluded).
pub const TARGET_LEN: usize = 32;
pub const ANCHOR_LEN: usize = 32;

/// Data item: tag-count and tag-bytes-length widths.
pub const TAG_COUNT_LEN: usize = 8;
pub const TAG_BYTES_LEN: usize = 8;

/// Presence flag values for target / anchor.
pub const FLAG_ABSENT: u8 = 0;
pub const FLAG_PRESENT: u8 = 1;

/// Largest value a size/count field may carry.
///
/// The 32-byte fields are read as little-endian `u64`; any non-zero byte
/// above the low eight is rejected instead of truncated.
pub const MAX_FIELD_VALUE: u64 = u64::MAX;

/// Mandatory tags on any bundle transaction.
pub mod bundle_tags {
    pub const FORMAT_NAME: &str = "Bundle-Format";
    pub const FORMAT_VALUE: &str = "binary";
    pub const VERSION_NAME: &str = "Bundle-Version";
    pub const VERSION_VALUE: &str = "2.0.0";
}

/// Signature scheme identifiers (mirrored in the item layout).
pub mod signature_ids {
    pub const ARWEAVE: u16  = 0x0001;
    pub const ED25519: u16  = 0x0002;
    pub const ETHEREUM: u16 = 0x0003;
    pub const SOLANA: u16   = 0x0004;
}

/// Deep-hash domain values for the data item signing message.
pub const DEEP_HASH_ITEM_KIND: &[u8] = b"dataitem";
pub const DEEP_HASH_ITEM_VERSION: &[u8] = b"1";
