//! codec.rs
//!
//! Fixed-width little-endian integer fields.
//!
//! Design notes:
//! - Size and count fields reserve 32 bytes but carry a `u64`; bytes above
//!   the low eight must be zero, otherwise the value is rejected (never truncated).
//! - Pure functions, no allocation beyond the output buffer.

use byteorder::{ByteOrder, LittleEndian};

use crate::constants::{COUNT_LEN, SIGNATURE_TYPE_LEN, TAG_COUNT_LEN};
use crate::types::{BundleError, Result};

/// Interpret `bytes` as a little-endian unsigned integer.
///
/// Fails with `BundleError::Format` if the value does not fit in a `u64`.
pub fn bytes_to_uint(bytes: &[u8]) -> Result<u64> {
    let low = bytes.len().min(8);
    if let Some(pos) = bytes[low..].iter().position(|&b| b != 0) {
        return Err(BundleError::format(format!(
            "integer field of {} bytes overflows u64 (non-zero byte at {})",
            bytes.len(),
            low + pos
        )));
    }

    let mut buf = [0u8; 8];
    buf[..low].copy_from_slice(&bytes[..low]);
    Ok(LittleEndian::read_u64(&buf))
}

/// Write `value` into exactly `width` little-endian bytes, zero padded.
///
/// Fails with `BundleError::Format` if `value` needs more than `width` bytes.
pub fn uint_to_bytes(value: u64, width: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; width];
    put_uint(&mut out, value)?;
    Ok(out)
}

/// In-place variant of [`uint_to_bytes`]; `out.len()` is the width.
pub fn put_uint(out: &mut [u8], value: u64) -> Result<()> {
    let width = out.len();
    if width < 8 && value >> (8 * width) != 0 {
        return Err(BundleError::format(format!(
            "value {value} does not fit in {width} bytes"
        )));
    }

    let le = value.to_le_bytes();
    let n = width.min(8);
    out[..n].copy_from_slice(&le[..n]);
    out[n..].fill(0);
    Ok(())
}

/// Convert a decoded field to an in-memory offset.
pub fn to_usize(value: u64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| BundleError::format(format!("{what} {value} exceeds platform usize")))
}

// ================= Layout shorthands =================

#[inline]
pub fn read_signature_type(bytes: &[u8]) -> Result<u16> {
    if bytes.len() < SIGNATURE_TYPE_LEN {
        return Err(BundleError::out_of_bounds("signature type", 0, SIGNATURE_TYPE_LEN as u64, bytes.len() as u64));
    }
    Ok(LittleEndian::read_u16(&bytes[..SIGNATURE_TYPE_LEN]))
}

#[inline]
pub fn signature_type_bytes(sig_type: u16) -> [u8; SIGNATURE_TYPE_LEN] {
    sig_type.to_le_bytes()
}

#[inline]
pub fn counter_bytes(value: u64) -> [u8; TAG_COUNT_LEN] {
    value.to_le_bytes()
}

#[inline]
pub fn count_bytes(value: u64) -> [u8; COUNT_LEN] {
    let mut out = [0u8; COUNT_LEN];
    out[..8].copy_from_slice(&value.to_le_bytes());
    out
}
