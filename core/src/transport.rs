//! transport.rs
//! Contract of the external transaction/transport collaborator.
//!
//! Nothing here talks to a network. Bundles hand their bytes (whole or as a
//! stream) to a `Transport`, attach the mandatory format tags to whatever
//! transaction it returns, and let it sign and upload.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::constants::bundle_tags;
use crate::types::Result;

/// Finite, single-pass stream of payload chunks.
pub type ByteStream<'a> = BoxStream<'a, io::Result<Bytes>>;

/// Transaction-like object returned by a transport.
pub trait Transaction: Send {
    fn add_tag(&mut self, name: &str, value: &str);
}

#[async_trait]
pub trait Transport: Send + Sync {
    type Key: Send + Sync + ?Sized;
    type Tx: Transaction;

    async fn create_transaction(&self, data: Bytes, key: &Self::Key) -> Result<Self::Tx>;

    /// Build a transaction by consuming `data` without buffering it.
    async fn create_transaction_streamed(&self, data: ByteStream<'_>, key: &Self::Key) -> Result<Self::Tx>;

    async fn sign(&self, tx: &mut Self::Tx, key: &Self::Key) -> Result<()>;

    /// Upload the payload of a signed transaction from a fresh stream.
    async fn upload_streamed(&self, tx: &Self::Tx, data: ByteStream<'_>) -> Result<()>;
}

/// Attach `Bundle-Format: binary` and `Bundle-Version: 2.0.0`.
pub fn add_bundle_tags<T: Transaction + ?Sized>(tx: &mut T) {
    tx.add_tag(bundle_tags::FORMAT_NAME, bundle_tags::FORMAT_VALUE);
    tx.add_tag(bundle_tags::VERSION_NAME, bundle_tags::VERSION_VALUE);
}

/// `true` for tag names reserved for the bundle format tags.
pub fn is_reserved_tag(name: &str) -> bool {
    name == bundle_tags::FORMAT_NAME || name == bundle_tags::VERSION_NAME
}
