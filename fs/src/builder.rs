//! File-backed item builder.
//!
//! Writes the layout prefix, then streams the payload straight into a fresh
//! temp file. The temp file is removed on every error path; only a fully
//! written item is kept.

use bundle_core::data_item::{check_signer, encode_item_prefix, DataItemOptions};
use bundle_core::signing::Signer;
use bundle_core::tags::TagCodec;
use bundle_core::types::{BundleError, Result};
use futures::TryStreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::config::FsConfig;
use crate::file_item::FileDataItem;
use crate::io::Payload;

/// Build an unsigned item file in `config.temp_dir()`.
pub async fn create_data<'a>(
    payload: impl Into<Payload<'a>>,
    signer: &dyn Signer,
    opts: &DataItemOptions,
    codec: &dyn TagCodec,
    config: &FsConfig,
) -> Result<FileDataItem> {
    check_signer(&config.registry, signer)?;
    let prefix = encode_item_prefix(signer, opts, codec)?;

    let dir = config.temp_dir();
    let (std_file, temp_path) = tempfile::Builder::new()
        .prefix("item-")
        .tempfile_in(&dir)?
        .into_parts();

    let mut out = BufWriter::with_capacity(config.chunk_size, File::from_std(std_file));
    out.write_all(&prefix).await?;
    let mut data_len = 0u64;
    match payload.into() {
        Payload::Bytes(bytes) => {
            out.write_all(&bytes).await?;
            data_len = bytes.len() as u64;
        }
        Payload::Stream(mut chunks) => {
            while let Some(chunk) = chunks.try_next().await? {
                out.write_all(&chunk).await?;
                data_len += chunk.len() as u64;
            }
        }
    }
    out.flush().await?;
    out.into_inner().sync_all().await?;

    let path = temp_path
        .keep()
        .map_err(|e| BundleError::Io(e.error))?;
    debug!(path = %path.display(), data_len, tags = opts.tags.len(), "file data item built");
    Ok(FileDataItem::with_config(path, config.clone()))
}
