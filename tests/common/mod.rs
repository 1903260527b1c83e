#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tv_store::config::Config;
use tv_store::notifications::BroadcastNotifier;
use tv_store::{Caller, ContentValues, ResourceUri, TvStore};

pub const OWNER: &str = "com.example.tuner";
pub const OTHER: &str = "com.example.other";

/// Store on a fresh on-disk database plus a subscription to its changes.
/// Keep the `TempDir` alive for as long as the store is used.
pub struct TestStore {
    pub dir: TempDir,
    pub store: TvStore,
    pub changes: broadcast::Receiver<ResourceUri>,
}

pub fn config_in(dir: &Path, schema_version: u32) -> Config {
    let mut config = Config::for_database(format!("sqlite://{}", dir.join("tv.db").display()));
    config.schema.version = schema_version;
    config.storage.legacy_logo_path = dir.join("logo");
    config
}

pub async fn open_store() -> TestStore {
    open_store_with_version(15).await
}

pub async fn open_store_with_version(schema_version: u32) -> TestStore {
    let dir = TempDir::new().unwrap();
    let notifier = Arc::new(BroadcastNotifier::new(256));
    let changes = notifier.subscribe();
    let store = TvStore::open(config_in(dir.path(), schema_version), notifier)
        .await
        .unwrap();
    TestStore {
        dir,
        store,
        changes,
    }
}

/// Everything notified so far, in delivery order.
pub fn drain(changes: &mut broadcast::Receiver<ResourceUri>) -> Vec<ResourceUri> {
    let mut received = Vec::new();
    while let Ok(uri) = changes.try_recv() {
        received.push(uri);
    }
    received
}

pub fn owner() -> Caller {
    Caller::new(OWNER)
}

pub fn other() -> Caller {
    Caller::new(OTHER)
}

pub fn channel_values(input_id: &str, display_number: &str) -> ContentValues {
    ContentValues::new()
        .with("input_id", input_id)
        .with("display_number", display_number)
        .with("display_name", format!("Channel {display_number}"))
}

pub fn program_values(channel_id: i64, title: &str, start: i64, end: i64) -> ContentValues {
    ContentValues::new()
        .with("channel_id", channel_id)
        .with("title", title)
        .with("start_time_utc_millis", start)
        .with("end_time_utc_millis", end)
}

pub fn id_of(uri: &ResourceUri) -> i64 {
    uri.segments()
        .last()
        .and_then(|segment| segment.parse().ok())
        .unwrap()
}

pub async fn insert_channel(store: &TvStore, caller: &Caller, input_id: &str, number: &str) -> i64 {
    let uri = store
        .insert(caller, &ResourceUri::channels(), channel_values(input_id, number))
        .await
        .unwrap();
    id_of(&uri)
}

pub async fn insert_program(
    store: &TvStore,
    caller: &Caller,
    channel_id: i64,
    title: &str,
    start: i64,
    end: i64,
) -> i64 {
    let uri = store
        .insert(
            caller,
            &ResourceUri::programs(),
            program_values(channel_id, title, start, end),
        )
        .await
        .unwrap();
    id_of(&uri)
}

pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 120, 220, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
