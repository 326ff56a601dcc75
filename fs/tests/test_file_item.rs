// File-backed data item: builder, positional accessors, signing, verify.

mod common;

#[cfg(test)]
mod tests {

use bundle_core::prelude::*;
use bundle_core::transport::ByteStream;
use bundle_core::utils::base64url_encode;
use bundle_fs::{FileDataItem, FsConfig};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::io::AsyncReadExt;

use crate::common::{config, file_item, memory_item, signer, JsonTags};

fn full_opts() -> DataItemOptions {
    DataItemOptions::default()
        .with_target([0x11u8; 32])
        .with_anchor([0x22u8; 32])
        .with_tag("a", "b")
}

// ## 1️⃣ Builder

    #[tokio::test]
    async fn ten_byte_payload_signs_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let s = signer(1);
        let mut item = bundle_fs::create_data(
            vec![3u8; 10],
            &s,
            &DataItemOptions::default().with_tag("a", "b"),
            &JsonTags,
            &cfg,
        )
        .await
        .unwrap();

        assert!(item.path().starts_with(dir.path()));
        assert!(!item.is_signed().await);
        assert!(!item.is_valid().await);

        item.sign(&s).await.unwrap();
        assert!(item.is_signed().await);
        assert!(item.is_valid().await);
        assert!(FileDataItem::verify(item.path(), &cfg).await);
    }

    #[tokio::test]
    async fn file_bytes_match_in_memory_builder() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let on_disk = file_item(2, b"same bytes", &full_opts(), &cfg).await;
        let in_memory = memory_item(2, b"same bytes", &full_opts());

        let bytes = tokio::fs::read(on_disk.path()).await.unwrap();
        assert_eq!(&bytes[..], &in_memory.get_raw()[..]);
        assert_eq!(on_disk.id().await.unwrap(), in_memory.id().unwrap());
    }

    #[tokio::test]
    async fn streamed_payload_is_written_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let chunks: ByteStream<'static> = stream::iter(
            ["alpha-", "beta-", "", "gamma"].map(|c| Ok(Bytes::from_static(c.as_bytes()))),
        )
        .boxed();

        let s = signer(3);
        let mut item = bundle_fs::create_data(chunks, &s, &DataItemOptions::default(), &JsonTags, &cfg)
            .await
            .unwrap();
        item.sign(&s).await.unwrap();

        assert_eq!(&item.raw_data().await.unwrap()[..], b"alpha-beta-gamma");
        assert!(item.is_valid().await);
    }

    #[tokio::test]
    async fn failing_stream_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let chunks: ByteStream<'static> = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("source went away")),
        ])
        .boxed();

        let err = bundle_fs::create_data(chunks, &signer(4), &DataItemOptions::default(), &JsonTags, &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, BundleError::Io(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn bad_target_length_is_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let err = bundle_fs::create_data(
            b"x".to_vec(),
            &signer(5),
            &DataItemOptions::default().with_target(vec![0u8; 12]),
            &JsonTags,
            &config(dir.path()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BundleError::SizeMismatch { field: "target", .. }));
    }

// ## 2️⃣ Accessors

    #[tokio::test]
    async fn accessors_match_in_memory_item() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let f = file_item(6, b"payload bytes", &full_opts(), &cfg).await;
        let m = memory_item(6, b"payload bytes", &full_opts());

        assert_eq!(f.signature_type().await.unwrap(), m.signature_type().unwrap());
        assert_eq!(f.signature_length().await.unwrap(), 64);
        assert_eq!(f.owner_length().await.unwrap(), 32);
        assert_eq!(f.raw_signature().await.unwrap(), m.raw_signature().unwrap());
        assert_eq!(f.owner().await.unwrap(), m.owner().unwrap());
        assert_eq!(f.target_start().await.unwrap(), m.target_start().unwrap());
        assert_eq!(f.anchor_start().await.unwrap(), m.anchor_start().unwrap());
        assert_eq!(f.tags_start().await.unwrap(), m.tags_start().unwrap());
        assert_eq!(f.data_start().await.unwrap(), m.data_start().unwrap());
        assert_eq!(f.target().await.unwrap(), Some(base64url_encode(&[0x11u8; 32])));
        assert_eq!(f.raw_anchor().await.unwrap().as_deref(), Some(&[0x22u8; 32][..]));
        assert_eq!(f.tag_count().await.unwrap(), 1);
        assert_eq!(f.tags(&JsonTags).await.unwrap(), vec![Tag::new("a", "b")]);
        assert_eq!(f.data().await.unwrap(), m.data().unwrap());
        assert_eq!(f.size().await.unwrap(), m.size() as u64);
        assert_eq!(f.signature_data().await.unwrap(), m.signature_data().unwrap());
    }

    #[tokio::test]
    async fn data_reader_is_bounded_to_payload() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let item = file_item(7, &[0x5A; 1000], &DataItemOptions::default(), &cfg).await;

        let mut reader = item.data_reader().await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, vec![0x5A; 1000]);
    }

    #[tokio::test]
    async fn truncated_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let item = file_item(8, b"abc", &full_opts(), &cfg).await;
        let path = dir.path().join("truncated");
        let bytes = tokio::fs::read(item.path()).await.unwrap();
        tokio::fs::write(&path, &bytes[..120]).await.unwrap();

        let cut = FileDataItem::with_config(&path, cfg.clone());
        assert!(matches!(cut.raw_tags().await, Err(BundleError::Format(_))));
        assert!(cut.raw_owner().await.is_ok());
        assert!(!cut.is_valid().await);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let item = FileDataItem::new(dir.path().join("nope"));
        assert!(matches!(item.raw_signature().await, Err(BundleError::Io(_))));
        assert!(!item.is_signed().await);
        assert!(!FileDataItem::verify(item.path(), &FsConfig::default()).await);
    }

// ## 3️⃣ Identity + tamper

    #[tokio::test]
    async fn seeded_id_until_signature_id_is_computed() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let item = file_item(9, b"id", &DataItemOptions::default(), &cfg).await;
        let real = item.raw_id().await.unwrap();

        let seeded = FileDataItem::with_config(item.path(), cfg.clone()).with_raw_id([1u8; 32]);
        assert_eq!(seeded.raw_id().await.unwrap(), [1u8; 32]);
        assert_eq!(seeded.signature_raw_id().await.unwrap(), real);
        assert_eq!(seeded.raw_id().await.unwrap(), real);
    }

    #[tokio::test]
    async fn flipped_byte_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let item = file_item(10, &[1u8; 64], &full_opts(), &cfg).await;
        let clean = tokio::fs::read(item.path()).await.unwrap();
        let data_start = item.data_start().await.unwrap() as usize;

        for at in [5usize, 70, 110, data_start + 20] {
            let mut bytes = clean.clone();
            bytes[at] ^= 0x80;
            tokio::fs::write(item.path(), &bytes).await.unwrap();
            assert!(!item.is_valid().await, "flip at {at} still valid");
        }
        tokio::fs::write(item.path(), &clean).await.unwrap();
        assert!(item.is_valid().await);
    }
}
