//! bundle/mod.rs
//! Multi-item container: count header, offset/id table, concatenated bodies.
//!
//! Layout (little-endian):
//!
//! ```text
//! count            [u8; 32]
//! count x row      [u8; 32] item size || [u8; 32] raw item id
//! bodies           item bytes, in table order
//! ```
//!
//! Design notes:
//! - Table order is storage order; item `i` starts at the sum of sizes `0..i`.
//! - Table ids must equal SHA-256 of each item's signature; `verify` checks both.

pub mod header;
pub mod view;
pub mod assemble;

pub use header::*;
pub use view::*;
pub use assemble::*;
