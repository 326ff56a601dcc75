//! Bundle split across files: one header file plus one body file per item.
//!
//! Design notes:
//! - The header file holds exactly the in-memory header (count + rows).
//! - `txs[i]` is the body file of table row `i`.
//! - Header rows are read lazily; only `get_raw` loads the whole bundle.

use std::path::{Path, PathBuf};

use bundle_core::bundle::{bundle_start, row_offset, HeaderEntry};
use bundle_core::codec::{bytes_to_uint, to_usize};
use bundle_core::constants::{COUNT_LEN, ROW_LEN};
use bundle_core::tags::Tag;
use bundle_core::transport::{add_bundle_tags, is_reserved_tag, ByteStream, Transaction, Transport};
use bundle_core::types::{BundleError, Result};
use bundle_core::utils::{base64url_encode, decode_id};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::config::FsConfig;
use crate::file_item::FileDataItem;
use crate::io::{concat_files, file_stream, RegionReader};

/// Name of the header file inside a bundle directory.
pub const HEADER_FILE_NAME: &str = "header";

#[derive(Debug, Clone)]
pub struct FileBundle {
    header_file: PathBuf,
    txs: Vec<PathBuf>,
    config: FsConfig,
}

/// Open the header file and return it positioned at the first row.
async fn open_header(path: &Path) -> Result<(File, usize)> {
    let mut file = File::open(path).await?;
    let len = file.metadata().await?.len();
    if len < COUNT_LEN as u64 {
        return Err(BundleError::out_of_bounds("bundle count", 0, COUNT_LEN as u64, len));
    }
    let mut count = [0u8; COUNT_LEN];
    file.read_exact(&mut count).await?;
    let count = to_usize(bytes_to_uint(&count)?, "bundle item count")?;
    let need = bundle_start(count)? as u64;
    if need > len {
        return Err(BundleError::format(format!(
            "offset table for {count} items needs {need} bytes, header file has {len}"
        )));
    }
    Ok((file, count))
}

impl FileBundle {
    /// Bundle over `header_file` with body files `txs` in table order.
    pub async fn new(header_file: impl Into<PathBuf>, txs: Vec<PathBuf>) -> Result<Self> {
        Self::with_config(header_file, txs, FsConfig::default()).await
    }

    pub async fn with_config(header_file: impl Into<PathBuf>, txs: Vec<PathBuf>, config: FsConfig) -> Result<Self> {
        let header_file = header_file.into();
        let (_, count) = open_header(&header_file).await?;
        if count != txs.len() {
            return Err(BundleError::format(format!(
                "header declares {count} items, {} body files given",
                txs.len()
            )));
        }
        debug!(header = %header_file.display(), items = count, "file bundle opened");
        Ok(Self { header_file, txs, config })
    }

    /// Open `dir/header`; body files are `dir/<id>` for each row.
    pub async fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_dir_with_config(dir, FsConfig::default()).await
    }

    pub async fn from_dir_with_config(dir: impl AsRef<Path>, config: FsConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let header_file = dir.join(HEADER_FILE_NAME);
        let txs: Vec<PathBuf> = headers_of(header_file.clone())
            .map_ok(|h| dir.join(h.id()))
            .try_collect()
            .await?;
        Self::with_config(header_file, txs, config).await
    }

    pub fn header_file(&self) -> &Path {
        &self.header_file
    }

    pub fn txs(&self) -> &[PathBuf] {
        &self.txs
    }

    /// Item count from the header file.
    pub async fn length(&self) -> Result<usize> {
        Ok(open_header(&self.header_file).await?.1)
    }

    /// Lazy rows of the header file. Each call reopens the file; dropping the
    /// stream closes it.
    pub fn headers(&self) -> BoxStream<'static, Result<HeaderEntry>> {
        headers_of(self.header_file.clone())
    }

    pub async fn get_ids(&self) -> Result<Vec<String>> {
        self.headers().map_ok(|h| h.id()).try_collect().await
    }

    pub async fn get_sizes(&self) -> Result<Vec<u64>> {
        self.headers().map_ok(|h| h.size).try_collect().await
    }

    pub async fn get_id_by(&self, index: usize) -> Result<String> {
        Ok(self.header(index).await?.id())
    }

    async fn header(&self, index: usize) -> Result<HeaderEntry> {
        let length = self.txs.len();
        if index >= length {
            return Err(BundleError::Range { index, length });
        }
        let mut r = RegionReader::open(&self.header_file).await?;
        let row = r.read(row_offset(index) as u64, ROW_LEN as u64, "offset table row").await?;
        HeaderEntry::decode(&row)
    }

    fn item(&self, index: usize, header: &HeaderEntry) -> FileDataItem {
        FileDataItem::with_config(self.txs[index].clone(), self.config.clone()).with_raw_id(header.raw_id)
    }

    pub async fn get_by_index(&self, index: usize) -> Result<FileDataItem> {
        let header = self.header(index).await?;
        Ok(self.item(index, &header))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<FileDataItem> {
        let not_found = || BundleError::NotFound { id: id.to_string() };
        let raw_id = decode_id(id).map_err(|_| not_found())?;
        let mut headers = self.headers().enumerate();
        while let Some((index, header)) = headers.next().await {
            let header = header?;
            if header.raw_id == raw_id {
                return Ok(self.item(index, &header));
            }
        }
        Err(not_found())
    }

    /// Lazy items in table order, ids seeded from the header.
    pub fn items(&self) -> BoxStream<'static, Result<FileDataItem>> {
        let config = self.config.clone();
        self.headers()
            .zip(stream::iter(self.txs.clone()))
            .map(move |(header, path)| {
                header.map(|h| FileDataItem::with_config(path, config.clone()).with_raw_id(h.raw_id))
            })
            .boxed()
    }

    /// Header followed by every body, in one buffer.
    pub async fn get_raw(&self) -> Result<Bytes> {
        let mut out = BytesMut::from(&tokio::fs::read(&self.header_file).await?[..]);
        for tx in &self.txs {
            out.extend_from_slice(&tokio::fs::read(tx).await?);
        }
        Ok(out.freeze())
    }

    /// Header followed by every body, as one chunk stream.
    pub fn stream(&self) -> ByteStream<'static> {
        let chunk = self.config.chunk_size;
        file_stream(self.header_file.clone(), chunk)
            .chain(concat_files(self.txs.clone(), chunk))
            .boxed()
    }

    /// `true` iff every item verifies and matches its header id and size.
    pub async fn verify(&self) -> bool {
        let mut items = self.headers().zip(stream::iter(self.txs.clone())).enumerate();
        while let Some((index, (header, path))) = items.next().await {
            let header = match header {
                Ok(h) => h,
                Err(e) => {
                    warn!(index, error = %e, "bundle header row unreadable");
                    return false;
                }
            };
            let item = FileDataItem::with_config(path, self.config.clone());
            match item.size().await {
                Ok(size) if size == header.size => {}
                size => {
                    warn!(index, declared = header.size, actual = ?size.ok(), "bundle row size does not match its body file");
                    return false;
                }
            }
            if !item.is_valid().await {
                debug!(index, "bundle item signature invalid");
                return false;
            }
            match item.signature_raw_id().await {
                Ok(actual) if actual == header.raw_id => {}
                _ => {
                    debug!(index, id = %base64url_encode(&header.raw_id), "bundle item id does not match its signature");
                    return false;
                }
            }
        }
        true
    }

    /// Stream the bundle into a new transaction and tag it.
    pub async fn to_transaction<T: Transport>(&self, transport: &T, key: &T::Key) -> Result<T::Tx> {
        let mut tx = transport.create_transaction_streamed(self.stream(), key).await?;
        add_bundle_tags(&mut tx);
        Ok(tx)
    }

    /// Tag, sign and upload in one pipeline.
    ///
    /// Caller tags go first; any named like a format tag is dropped so the
    /// mandatory pair is the only one on the transaction.
    pub async fn sign_and_submit<T: Transport>(&self, transport: &T, key: &T::Key, tags: &[Tag]) -> Result<T::Tx> {
        let mut tx = transport.create_transaction_streamed(self.stream(), key).await?;
        for tag in tags.iter().filter(|t| !is_reserved_tag(&t.name)) {
            tx.add_tag(&tag.name, &tag.value);
        }
        add_bundle_tags(&mut tx);
        transport.sign(&mut tx, key).await?;
        transport.upload_streamed(&tx, self.stream()).await?;
        debug!(header = %self.header_file.display(), items = self.txs.len(), "bundle submitted");
        Ok(tx)
    }
}

fn headers_of(path: PathBuf) -> BoxStream<'static, Result<HeaderEntry>> {
    stream::once(async move { open_header(&path).await })
        .map_ok(|(file, count)| {
            stream::try_unfold((file, 0usize), move |(mut file, index)| async move {
                if index >= count {
                    return Ok::<_, BundleError>(None);
                }
                let mut row = [0u8; ROW_LEN];
                file.read_exact(&mut row).await?;
                Ok(Some((HeaderEntry::decode(&row)?, (file, index + 1))))
            })
        })
        .try_flatten()
        .boxed()
}
