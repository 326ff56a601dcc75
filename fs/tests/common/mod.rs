// Shared fixtures for the file-backed suites.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use bundle_core::prelude::*;
use bundle_core::transport::{ByteStream, Transaction, Transport};
use bundle_fs::{FileDataItem, FsConfig};
use bytes::Bytes;
use futures::TryStreamExt;

/// Tags as a JSON array of `{name, value}` objects.
pub struct JsonTags;

impl TagCodec for JsonTags {
    fn encode(&self, tags: &[Tag]) -> Result<Vec<u8>> {
        serde_json::to_vec(tags).map_err(|e| BundleError::Tags(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Tag>> {
        serde_json::from_slice(bytes).map_err(|e| BundleError::Tags(e.to_string()))
    }
}

pub fn signer(seed: u8) -> Ed25519Signer {
    Ed25519Signer::from_seed(&[seed; 32])
}

pub fn config(dir: &Path) -> FsConfig {
    FsConfig::default().with_temp_dir(dir).with_chunk_size(7)
}

pub fn memory_item(seed: u8, data: &[u8], opts: &DataItemOptions) -> DataItem {
    let mut item = create_data(data, &signer(seed), opts, &JsonTags).unwrap();
    item.sign(&signer(seed)).unwrap();
    item
}

pub async fn file_item(seed: u8, data: &[u8], opts: &DataItemOptions, config: &FsConfig) -> FileDataItem {
    let s = signer(seed);
    let mut item = bundle_fs::create_data(data.to_vec(), &s, opts, &JsonTags, config).await.unwrap();
    item.sign(&s).await.unwrap();
    item
}

#[derive(Debug, Default)]
pub struct RecordedTx {
    pub data: Vec<u8>,
    pub tags: Vec<(String, String)>,
    pub signed: bool,
}

impl Transaction for RecordedTx {
    fn add_tag(&mut self, name: &str, value: &str) {
        self.tags.push((name.to_string(), value.to_string()));
    }
}

/// Transport that keeps everything it is handed.
#[derive(Default)]
pub struct RecordingTransport {
    pub uploads: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    type Key = str;
    type Tx = RecordedTx;

    async fn create_transaction(&self, data: Bytes, _key: &str) -> Result<RecordedTx> {
        Ok(RecordedTx { data: data.to_vec(), ..Default::default() })
    }

    async fn create_transaction_streamed(&self, data: ByteStream<'_>, _key: &str) -> Result<RecordedTx> {
        let chunks: Vec<Bytes> = data.try_collect().await?;
        Ok(RecordedTx { data: chunks.concat(), ..Default::default() })
    }

    async fn sign(&self, tx: &mut RecordedTx, _key: &str) -> Result<()> {
        tx.signed = true;
        Ok(())
    }

    async fn upload_streamed(&self, _tx: &RecordedTx, data: ByteStream<'_>) -> Result<()> {
        let chunks: Vec<Bytes> = data.try_collect().await?;
        self.uploads
            .lock()
            .map_err(|_| BundleError::Transport("poisoned".into()))?
            .push(chunks.concat());
        Ok(())
    }
}
