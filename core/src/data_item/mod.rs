//! data_item/mod.rs
//! Single-item binary layout: parse (lazy, offset driven), build, sign, verify.
//!
//! Layout (little-endian):
//!
//! ```text
//! signature_type   u16
//! signature        [u8; scheme.signature_length]
//! owner            [u8; scheme.owner_length]
//! target_flag      u8   (+ [u8; 32] target iff flag == 1)
//! anchor_flag      u8   (+ [u8; 32] anchor iff flag == 1)
//! tag_count        u64
//! tag_bytes_len    u64
//! tags             [u8; tag_bytes_len]
//! data             remainder
//! ```

pub mod layout;
pub mod item;
pub mod builder;

pub use layout::*;
pub use item::*;
pub use builder::*;
