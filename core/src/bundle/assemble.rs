//! Write side: assemble signed items into a bundle buffer.

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::bundle::header::{encode_header, HeaderEntry};
use crate::bundle::view::Bundle;
use crate::data_item::DataItem;
use crate::signing::Signer;
use crate::types::{BundleError, Result};

/// Header rows for `items`, ids taken from each item's signature.
pub fn header_entries(items: &[DataItem]) -> Result<Vec<HeaderEntry>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_signed() {
                return Err(BundleError::format(format!("item {index} is unsigned")));
            }
            Ok(HeaderEntry { size: item.size() as u64, raw_id: item.signature_raw_id()? })
        })
        .collect()
}

impl Bundle {
    /// Concatenate already-signed items, in order, behind a fresh table.
    ///
    /// The result shares the registry of the first item.
    pub fn from_items(items: &[DataItem]) -> Result<Bundle> {
        let entries = header_entries(items)?;
        let header = encode_header(&entries);
        let body: usize = items.iter().map(DataItem::size).sum();

        let mut buf = BytesMut::with_capacity(header.len() + body);
        buf.extend_from_slice(&header);
        for item in items {
            buf.extend_from_slice(item.get_raw());
        }
        debug!(items = items.len(), bytes = buf.len(), "bundle assembled");

        let binary: Bytes = buf.freeze();
        match items.first() {
            Some(first) => Bundle::with_registry(binary, first.registry().clone()),
            None => Bundle::new(binary),
        }
    }
}

/// Sign every item with `signer`, then bundle them in order.
pub fn bundle_and_sign_data(mut items: Vec<DataItem>, signer: &dyn Signer) -> Result<Bundle> {
    for item in items.iter_mut() {
        item.sign(signer)?;
    }
    Bundle::from_items(&items)
}
