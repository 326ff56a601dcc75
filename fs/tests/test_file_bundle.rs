// File-backed bundle: directory layout, lazy header, equivalence with the
// in-memory codec, streamed submission.

mod common;

#[cfg(test)]
mod tests {

use std::path::PathBuf;

use bundle_core::constants::bundle_tags;
use bundle_core::prelude::*;
use bundle_fs::{FileBundle, FileBundleWriter, FileDataItem, FsConfig, HEADER_FILE_NAME};
use futures::{StreamExt, TryStreamExt};

use crate::common::{config, file_item, memory_item, JsonTags, RecordingTransport};

async fn three_file_items(cfg: &FsConfig) -> Vec<FileDataItem> {
    vec![
        file_item(1, b"first", &DataItemOptions::default().with_tag("n", "1"), cfg).await,
        file_item(2, &[0xAB; 333], &DataItemOptions::default(), cfg).await,
        file_item(3, b"", &DataItemOptions::default().with_target([7u8; 32]), cfg).await,
    ]
}

// ## 1️⃣ Directory layout

    #[tokio::test]
    async fn create_writes_header_and_one_file_per_item() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let items = three_file_items(&cfg).await;
        let dir = tmp.path().join("bundle");
        let bundle = FileBundle::create(&dir, &items, cfg.clone()).await.unwrap();

        assert_eq!(bundle.header_file(), dir.join(HEADER_FILE_NAME));
        assert_eq!(bundle.length().await.unwrap(), 3);
        let header = tokio::fs::read(bundle.header_file()).await.unwrap();
        assert_eq!(header.len(), 32 + 64 * 3);

        for (item, tx) in items.iter().zip(bundle.txs()) {
            assert_eq!(tx, &dir.join(item.id().await.unwrap()));
        }

        let reopened = FileBundle::from_dir_with_config(&dir, cfg).await.unwrap();
        assert_eq!(reopened.txs(), bundle.txs());
        assert!(reopened.verify().await);
    }

    #[tokio::test]
    async fn header_count_must_match_body_files() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let items = three_file_items(&cfg).await;
        let bundle = FileBundle::create(tmp.path().join("b"), &items, cfg).await.unwrap();

        let err = FileBundle::new(bundle.header_file(), vec![PathBuf::from("only-one")]).await.unwrap_err();
        assert!(matches!(err, BundleError::Format(_)));
    }

    #[tokio::test]
    async fn missing_header_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(FileBundle::from_dir(tmp.path()).await, Err(BundleError::Io(_))));
    }

    #[tokio::test]
    async fn truncated_header_is_a_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut count = vec![0u8; 32];
        count[0] = 2;
        tokio::fs::write(tmp.path().join(HEADER_FILE_NAME), &count).await.unwrap();
        assert!(matches!(FileBundle::from_dir(tmp.path()).await, Err(BundleError::Format(_))));
    }

// ## 2️⃣ Streaming vs in-memory

    #[tokio::test]
    async fn file_and_memory_bundles_agree() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let mut writer = FileBundleWriter::new(tmp.path().join("b"), cfg.clone()).await.unwrap();
        let memory_items = vec![
            memory_item(4, b"one", &DataItemOptions::default().with_tag("k", "v")),
            memory_item(5, &[9u8; 200], &DataItemOptions::default().with_anchor([1u8; 32])),
        ];
        for item in &memory_items {
            writer.add_data_item(item).await.unwrap();
        }
        assert_eq!(writer.len(), 2);
        let on_disk = writer.finish().await.unwrap();
        let in_memory = Bundle::from_items(&memory_items).unwrap();

        assert_eq!(on_disk.get_ids().await.unwrap(), in_memory.get_ids());
        assert_eq!(on_disk.get_sizes().await.unwrap(), in_memory.get_sizes().unwrap());
        assert_eq!(on_disk.get_raw().await.unwrap(), in_memory.get_raw().clone());

        let file_items: Vec<FileDataItem> = on_disk.items().try_collect().await.unwrap();
        for (f, m) in file_items.iter().zip(in_memory.items()) {
            let m = m.unwrap();
            assert_eq!(f.id().await.unwrap(), m.id().unwrap());
            assert_eq!(f.raw_owner().await.unwrap(), m.raw_owner().unwrap());
            assert_eq!(f.raw_anchor().await.unwrap(), m.raw_anchor().unwrap());
            assert_eq!(f.tags(&JsonTags).await.unwrap(), m.tags(&JsonTags).unwrap());
            assert_eq!(f.raw_data().await.unwrap(), m.raw_data().unwrap());
        }

        let parsed = Bundle::new(on_disk.get_raw().await.unwrap()).unwrap();
        assert!(parsed.verify());
    }

// ## 3️⃣ Random access

    #[tokio::test]
    async fn index_and_id_lookups_agree() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let items = three_file_items(&cfg).await;
        let bundle = FileBundle::create(tmp.path().join("b"), &items, cfg).await.unwrap();

        let ids = bundle.get_ids().await.unwrap();
        assert_eq!(ids.len(), 3);
        for (i, id) in ids.iter().enumerate() {
            let by_index = bundle.get_by_index(i).await.unwrap();
            let by_id = bundle.get_by_id(id).await.unwrap();
            assert_eq!(by_index.raw_signature().await.unwrap(), by_id.raw_signature().await.unwrap());
            assert_eq!(&by_index.id().await.unwrap(), id);
            assert_eq!(&bundle.get_id_by(i).await.unwrap(), id);
        }

        assert!(matches!(bundle.get_by_index(3).await, Err(BundleError::Range { index: 3, length: 3 })));
        assert!(matches!(bundle.get_by_id("nonexistent-id").await, Err(BundleError::NotFound { .. })));
    }

    #[tokio::test]
    async fn headers_stream_can_be_dropped_early_and_restarted() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let items = three_file_items(&cfg).await;
        let bundle = FileBundle::create(tmp.path().join("b"), &items, cfg).await.unwrap();

        let first = bundle.headers().next().await.unwrap().unwrap();
        let all: Vec<_> = bundle.headers().try_collect().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], first);
        assert_eq!(first.size, items[0].size().await.unwrap());
    }

// ## 4️⃣ Verification

    #[tokio::test]
    async fn tampered_body_file_fails_verification() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let items = three_file_items(&cfg).await;
        let bundle = FileBundle::create(tmp.path().join("b"), &items, cfg).await.unwrap();
        assert!(bundle.verify().await);

        let target = &bundle.txs()[1];
        let mut bytes = tokio::fs::read(target).await.unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 1;
        tokio::fs::write(target, &bytes).await.unwrap();
        assert!(!bundle.verify().await);
    }

    #[tokio::test]
    async fn body_files_in_wrong_order_fail_verification() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let items = three_file_items(&cfg).await;
        let bundle = FileBundle::create(tmp.path().join("b"), &items, cfg.clone()).await.unwrap();

        let mut txs = bundle.txs().to_vec();
        txs.swap(0, 1);
        let swapped = FileBundle::with_config(bundle.header_file(), txs, cfg).await.unwrap();
        assert!(!swapped.verify().await);
    }

    #[tokio::test]
    async fn overstated_row_size_fails_verification() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let items = three_file_items(&cfg).await;
        let bundle = FileBundle::create(tmp.path().join("b"), &items, cfg).await.unwrap();

        let mut header = tokio::fs::read(bundle.header_file()).await.unwrap();
        let size = u64::from_le_bytes(header[32..40].try_into().unwrap());
        header[32..40].copy_from_slice(&(size + 5).to_le_bytes());
        tokio::fs::write(bundle.header_file(), &header).await.unwrap();

        assert_eq!(bundle.get_sizes().await.unwrap()[0], size + 5);
        assert!(!bundle.verify().await);
        assert!(!Bundle::new(bundle.get_raw().await.unwrap()).unwrap().verify());
    }

    #[tokio::test]
    async fn add_owned_moves_the_item_file() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let item = file_item(7, b"moved", &DataItemOptions::default(), &cfg).await;
        let source = item.path().to_path_buf();
        let id = item.id().await.unwrap();

        let mut writer = FileBundleWriter::new(tmp.path().join("b"), cfg).await.unwrap();
        writer.add_owned(item).await.unwrap();
        let bundle = writer.finish().await.unwrap();

        assert!(!source.exists());
        assert_eq!(bundle.txs(), &[tmp.path().join("b").join(&id)]);
        assert!(bundle.verify().await);
    }

    #[tokio::test]
    async fn unsigned_items_are_rejected_by_the_writer() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let s = crate::common::signer(6);
        let unsigned = bundle_fs::create_data(b"u".to_vec(), &s, &DataItemOptions::default(), &JsonTags, &cfg)
            .await
            .unwrap();
        let mut writer = FileBundleWriter::new(tmp.path().join("b"), cfg).await.unwrap();
        assert!(matches!(writer.add(&unsigned).await, Err(BundleError::Format(_))));
        assert!(writer.is_empty());
    }

// ## 5️⃣ Transport

    #[tokio::test]
    async fn to_transaction_streams_the_whole_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let items = three_file_items(&cfg).await;
        let bundle = FileBundle::create(tmp.path().join("b"), &items, cfg).await.unwrap();

        let transport = RecordingTransport::default();
        let tx = bundle.to_transaction(&transport, "key").await.unwrap();
        assert_eq!(tx.data, bundle.get_raw().await.unwrap().to_vec());
        assert_eq!(tx.tags.len(), 2);
        assert!(!tx.signed);
    }

    #[tokio::test]
    async fn sign_and_submit_orders_tags_and_uploads_fresh_stream() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let items = three_file_items(&cfg).await;
        let bundle = FileBundle::create(tmp.path().join("b"), &items, cfg).await.unwrap();

        let transport = RecordingTransport::default();
        let caller_tags = vec![
            Tag::new("App-Name", "uploader"),
            Tag::new(bundle_tags::FORMAT_NAME, "json"),
            Tag::new(bundle_tags::VERSION_NAME, "1.0.0"),
        ];
        let tx = bundle.sign_and_submit(&transport, "key", &caller_tags).await.unwrap();

        assert!(tx.signed);
        assert_eq!(
            tx.tags,
            vec![
                ("App-Name".to_string(), "uploader".to_string()),
                (bundle_tags::FORMAT_NAME.to_string(), bundle_tags::FORMAT_VALUE.to_string()),
                (bundle_tags::VERSION_NAME.to_string(), bundle_tags::VERSION_VALUE.to_string()),
            ]
        );
        let raw = bundle.get_raw().await.unwrap().to_vec();
        assert_eq!(tx.data, raw);
        assert_eq!(transport.uploads.lock().unwrap().as_slice(), &[raw]);
    }
}
