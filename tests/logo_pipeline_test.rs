mod common;

use common::*;
use image::GenericImageView;
use std::sync::Arc;
use tempfile::TempDir;
use tv_store::notifications::NoopNotifier;
use tv_store::{AppError, Caller, LogoError, QueryRequest, RequestError, ResourceUri, TvStore};

async fn upload(
    store: &TvStore,
    caller: &Caller,
    channel_id: i64,
    bytes: &[u8],
) -> Result<(), LogoError> {
    let mut writer = store
        .write_logo(caller, &ResourceUri::channel_logo(channel_id))
        .unwrap();
    writer.write_all(bytes, 1024).await?;
    writer.finish().wait().await
}

#[tokio::test]
async fn test_logo_is_scaled_and_stored_as_png() {
    let mut t = open_store().await;
    let id = insert_channel(&t.store, &owner(), "input-1", "1").await;
    drain(&mut t.changes);

    upload(&t.store, &owner(), id, &sample_png(600, 300))
        .await
        .unwrap();

    let stored = t
        .store
        .read_logo(&owner(), &ResourceUri::channel_logo(id))
        .await
        .unwrap();
    let decoded = image::load_from_memory_with_format(&stored, image::ImageFormat::Png).unwrap();
    assert_eq!(decoded.dimensions(), (256, 128));
    assert_eq!(drain(&mut t.changes), vec![ResourceUri::channel_logo(id)]);
}

#[tokio::test]
async fn test_small_logo_keeps_its_size() {
    let t = open_store().await;
    let id = insert_channel(&t.store, &owner(), "input-1", "1").await;

    upload(&t.store, &owner(), id, &sample_png(64, 48)).await.unwrap();

    let stored = t
        .store
        .read_logo(&owner(), &ResourceUri::channel_logo(id))
        .await
        .unwrap();
    assert_eq!(image::load_from_memory(&stored).unwrap().dimensions(), (64, 48));
}

#[tokio::test]
async fn test_undecodable_logo_is_dropped_silently() {
    let mut t = open_store().await;
    let id = insert_channel(&t.store, &owner(), "input-1", "1").await;
    drain(&mut t.changes);

    upload(&t.store, &owner(), id, b"this is not an image")
        .await
        .unwrap();

    let err = t
        .store
        .read_logo(&owner(), &ResourceUri::channel_logo(id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
    assert!(drain(&mut t.changes).is_empty());
}

#[tokio::test]
async fn test_logo_for_foreign_or_missing_channel_fails() {
    let t = open_store().await;
    let id = insert_channel(&t.store, &owner(), "input-1", "1").await;

    let err = upload(&t.store, &other(), id, &sample_png(10, 10))
        .await
        .unwrap_err();
    assert_eq!(err, LogoError::ChannelNotWritable { channel_id: id });

    let err = upload(&t.store, &owner(), id + 100, &sample_png(10, 10))
        .await
        .unwrap_err();
    assert_eq!(err, LogoError::ChannelNotWritable { channel_id: id + 100 });
}

#[tokio::test]
async fn test_logo_access_follows_ownership() {
    let t = open_store().await;
    let id = insert_channel(&t.store, &owner(), "input-1", "1").await;

    let guide = Caller::with_full_access(OTHER);
    upload(&t.store, &guide, id, &sample_png(20, 20)).await.unwrap();

    assert!(t
        .store
        .read_logo(&owner(), &ResourceUri::channel_logo(id))
        .await
        .is_ok());
    assert!(t
        .store
        .read_logo(&guide, &ResourceUri::channel_logo(id))
        .await
        .is_ok());
    let err = t
        .store
        .read_logo(&other(), &ResourceUri::channel_logo(id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn test_logo_is_not_a_generic_resource() {
    let t = open_store().await;
    let id = insert_channel(&t.store, &owner(), "input-1", "1").await;

    let err = t
        .store
        .query(&owner(), &ResourceUri::channel_logo(id), &QueryRequest::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Request(RequestError::UnsupportedOperation { .. })
    ));

    let err = t
        .store
        .write_logo(&owner(), &ResourceUri::channel(id))
        .unwrap_err();
    assert!(err.is_request_error());
}

#[tokio::test]
async fn test_oversized_upload_is_dropped() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path(), 15);
    config.logo.max_upload_bytes = 16;
    let store = TvStore::open(config, Arc::new(NoopNotifier)).await.unwrap();
    let id = insert_channel(&store, &owner(), "input-1", "1").await;

    upload(&store, &owner(), id, &sample_png(200, 200)).await.unwrap();

    assert!(store
        .read_logo(&owner(), &ResourceUri::channel_logo(id))
        .await
        .is_err());
}
