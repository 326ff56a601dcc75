use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use num_enum::TryFromPrimitive;

use crate::types::{BundleError, Result};

pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:04x}", raw),
    }
}

/// Base64url encode bytes without padding.
pub fn base64url_encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Base64url decode a string to bytes.
pub fn base64url_decode(s: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| BundleError::format(format!("invalid base64url {s:?}: {e}")))
}

/// Decode a base64url id into its 32 raw bytes.
pub fn decode_id(id: &str) -> Result<[u8; 32]> {
    let raw = base64url_decode(id)?;
    raw.as_slice()
        .try_into()
        .map_err(|_| BundleError::format(format!("id {id:?} decodes to {} bytes, expected 32", raw.len())))
}

/// Short hex preview for log lines.
pub fn fmt_bytes(b: &[u8]) -> String {
    if b.len() > 8 {
        format!("0x{}..", hex::encode(&b[..8]))
    } else {
        format!("0x{}", hex::encode(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64url_has_no_padding_or_unsafe_chars() {
        let encoded = base64url_encode(&[0xfb, 0xff, 0xfe, 0x01]);
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert_eq!(base64url_decode(&encoded).unwrap(), vec![0xfb, 0xff, 0xfe, 0x01]);
    }

    #[test]
    fn decode_id_rejects_wrong_width() {
        let short = base64url_encode(&[7u8; 31]);
        assert!(matches!(decode_id(&short), Err(BundleError::Format(_))));
        let ok = base64url_encode(&[7u8; 32]);
        assert_eq!(decode_id(&ok).unwrap(), [7u8; 32]);
    }

    #[test]
    fn unknown_enum_falls_back_to_hex() {
        use crate::signing::SignatureType;
        assert_eq!(enum_name_or_hex::<SignatureType>(2), "Ed25519");
        assert_eq!(enum_name_or_hex::<SignatureType>(0x99), "0x0099");
    }
}
