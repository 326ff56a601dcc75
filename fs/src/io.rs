//! Positional file reads and byte streams.
//!
//! Design notes:
//! - `RegionReader` owns one handle for the lifetime of one operation.
//! - Every read is bounds-checked against the file length first, so a short
//!   file fails with `BundleError::Format`, never with a bare EOF.
//! - Streams open their file lazily on first poll and close it on drop.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use bundle_core::codec::{bytes_to_uint, to_usize};
use bundle_core::crypto::BlobHasher;
use bundle_core::transport::ByteStream;
use bundle_core::types::{BundleError, Result};
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Payload of a new item: whole buffer or a single-pass chunk stream.
pub enum Payload<'a> {
    Bytes(Bytes),
    Stream(ByteStream<'a>),
}

impl From<Bytes> for Payload<'_> {
    fn from(b: Bytes) -> Self {
        Payload::Bytes(b)
    }
}

impl From<Vec<u8>> for Payload<'_> {
    fn from(v: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(v))
    }
}

impl From<&'static [u8]> for Payload<'_> {
    fn from(s: &'static [u8]) -> Self {
        Payload::Bytes(Bytes::from_static(s))
    }
}

impl<'a> From<ByteStream<'a>> for Payload<'a> {
    fn from(s: ByteStream<'a>) -> Self {
        Payload::Stream(s)
    }
}

/// One open handle plus the file length, for positional reads.
pub struct RegionReader {
    file: File,
    len: u64,
}

impl RegionReader {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        Ok(Self { file, len })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, offset: u64, need: u64, what: &str) -> Result<()> {
        match offset.checked_add(need) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(BundleError::out_of_bounds(what, offset, need, self.len)),
        }
    }

    /// Read exactly `need` bytes at `offset`.
    pub async fn read(&mut self, offset: u64, need: u64, what: &str) -> Result<Bytes> {
        self.check(offset, need, what)?;
        let mut buf = vec![0u8; to_usize(need, what)?];
        self.file.seek(SeekFrom::Start(offset)).await?;
        self.file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    pub async fn byte(&mut self, offset: u64, what: &str) -> Result<u8> {
        Ok(self.read(offset, 1, what).await?[0])
    }

    /// Little-endian unsigned field of `width` bytes.
    pub async fn uint(&mut self, offset: u64, width: usize, what: &str) -> Result<u64> {
        bytes_to_uint(&self.read(offset, width as u64, what).await?)
    }

    /// Feed `[offset, offset + need)` into `hasher`, `chunk` bytes at a time.
    pub async fn hash_region(&mut self, offset: u64, need: u64, chunk: usize, hasher: &mut BlobHasher) -> Result<()> {
        self.check(offset, need, "data")?;
        self.file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; chunk.max(1)];
        let mut left = need;
        while left > 0 {
            let n = (left.min(buf.len() as u64)) as usize;
            self.file.read_exact(&mut buf[..n]).await?;
            hasher.update(&buf[..n]);
            left -= n as u64;
        }
        Ok(())
    }
}

/// Stream a whole file, opened on first poll.
pub fn file_stream(path: PathBuf, chunk: usize) -> ByteStream<'static> {
    let open = async move {
        let file = File::open(&path).await?;
        Ok::<_, io::Error>(ReaderStream::with_capacity(file, chunk.max(1)))
    };
    stream::once(open).try_flatten().boxed()
}

/// Concatenate files, in order, into one stream.
pub fn concat_files(paths: Vec<PathBuf>, chunk: usize) -> ByteStream<'static> {
    stream::iter(paths)
        .map(move |path| file_stream(path, chunk))
        .flatten()
        .boxed()
}
