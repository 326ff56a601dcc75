//! Writes a bundle directory: `header` plus one body file per item.

use std::path::{Path, PathBuf};

use bundle_core::bundle::{encode_header, HeaderEntry};
use bundle_core::constants::ID_LEN;
use bundle_core::data_item::DataItem;
use bundle_core::types::{BundleError, Result};
use tokio::fs;
use tracing::debug;

use crate::config::FsConfig;
use crate::file_bundle::{FileBundle, HEADER_FILE_NAME};
use crate::file_item::FileDataItem;

/// Collects signed items in order; `finish` writes the header last.
#[derive(Debug)]
pub struct FileBundleWriter {
    dir: PathBuf,
    entries: Vec<HeaderEntry>,
    txs: Vec<PathBuf>,
    config: FsConfig,
}

impl FileBundleWriter {
    pub async fn new(dir: impl Into<PathBuf>, config: FsConfig) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir, entries: Vec::new(), txs: Vec::new(), config })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, size: u64, raw_id: [u8; ID_LEN], path: PathBuf) {
        self.entries.push(HeaderEntry { size, raw_id });
        self.txs.push(path);
    }

    async fn entry_for(item: &FileDataItem) -> Result<HeaderEntry> {
        if !item.is_signed().await {
            return Err(BundleError::format(format!("item {} is unsigned", item.path().display())));
        }
        Ok(HeaderEntry { size: item.size().await?, raw_id: item.signature_raw_id().await? })
    }

    /// Copy a signed file item into the bundle directory.
    ///
    /// The source file stays where it is and remains the caller's to remove.
    pub async fn add(&mut self, item: &FileDataItem) -> Result<()> {
        let entry = Self::entry_for(item).await?;
        let dest = self.dir.join(entry.id());
        if dest != item.path() {
            fs::copy(item.path(), &dest).await?;
        }
        self.push(entry.size, entry.raw_id, dest);
        Ok(())
    }

    /// Move a signed file item (e.g. a builder temp file) into the bundle
    /// directory. Falls back to copy + remove when rename fails, e.g. across
    /// devices.
    pub async fn add_owned(&mut self, item: FileDataItem) -> Result<()> {
        let entry = Self::entry_for(&item).await?;
        let dest = self.dir.join(entry.id());
        if dest != item.path() {
            if let Err(e) = fs::rename(item.path(), &dest).await {
                debug!(from = %item.path().display(), error = %e, "rename failed, copying instead");
                fs::copy(item.path(), &dest).await?;
                fs::remove_file(item.path()).await?;
            }
        }
        self.push(entry.size, entry.raw_id, dest);
        Ok(())
    }

    /// Write a signed in-memory item into the bundle directory.
    pub async fn add_data_item(&mut self, item: &DataItem) -> Result<()> {
        if !item.is_signed() {
            return Err(BundleError::format("in-memory item is unsigned"));
        }
        let raw_id = item.signature_raw_id()?;
        let dest = self.dir.join(bundle_core::utils::base64url_encode(&raw_id));
        fs::write(&dest, item.get_raw()).await?;
        self.push(item.size() as u64, raw_id, dest);
        Ok(())
    }

    /// Write `header` (via a temp name and rename) and open the bundle.
    pub async fn finish(self) -> Result<FileBundle> {
        let header = encode_header(&self.entries);
        let path = self.dir.join(HEADER_FILE_NAME);
        let temp = path.with_extension("tmp");
        fs::write(&temp, &header).await?;
        fs::rename(&temp, &path).await?;
        debug!(dir = %self.dir.display(), items = self.entries.len(), "bundle directory written");
        FileBundle::with_config(path, self.txs, self.config).await
    }
}

impl FileBundle {
    /// Write `items` (signed, in order) as a bundle directory under `dir`.
    ///
    /// Items are copied; see [`FileBundleWriter::add_owned`] to move them.
    pub async fn create(dir: impl Into<PathBuf>, items: &[FileDataItem], config: FsConfig) -> Result<FileBundle> {
        let mut writer = FileBundleWriter::new(dir, config).await?;
        for item in items {
            writer.add(item).await?;
        }
        writer.finish().await
    }
}
