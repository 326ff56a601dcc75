//! signing/mod.rs
//! Signer capability, scheme registry and the built-in Ed25519 scheme.
//!
//! Design notes:
//! - `Signer` is the caller-supplied capability (key custody stays outside).
//! - Verification is a per-scheme, stateless operation looked up by
//!   signature type in `SchemeRegistry`; it never needs a signer instance.
//! - Signature and owner lengths are layout constants of each scheme, so the
//!   codec resolves them from the registry, not from the item bytes.

pub mod types;
pub mod registry;
pub mod ed25519;

pub use types::*;
pub use registry::*;
pub use ed25519::*;
