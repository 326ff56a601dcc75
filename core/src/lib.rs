//! bundle-core
//!
//! Pure Rust codec for binary bundles of independently signed data items.
//! No async runtime, no filesystem.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod codec;

// Signing, hashing, tags
pub mod crypto;
pub mod signing;
pub mod tags;

// Layouts
pub mod data_item;
pub mod bundle;

// External collaborators
pub mod transport;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::bundle::{Bundle, ItemOffset, bundle_and_sign_data};
    pub use crate::data_item::{DataItem, DataItemOptions, create_data};
    pub use crate::signing::{Ed25519Signer, SchemeRegistry, SignatureType, Signer};
    pub use crate::tags::{Tag, TagCodec};
    pub use crate::types::{BundleError, Result};
}
