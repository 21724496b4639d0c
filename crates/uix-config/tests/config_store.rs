//! Integration tests for saving and reading the live document.
//!
//! Covers the repair of malformed documents on save, identity reuse across
//! saves, backups taken on every save, and the runtime snapshot.

#![allow(clippy::arithmetic_side_effects)]

mod common;

use std::sync::Arc;

use serde_json::{Value, json};
use uix_config::normalize::{
    FALLBACK_PORT_MAX, FALLBACK_PORT_MIN, is_valid_pin, is_valid_username,
};
use uix_config::{BackupStore, ConfigStore, StoragePaths, StoreSettings};

use common::{PIN, USERNAME, fixture, seed_document};

#[tokio::test]
async fn test_bad_port_document_is_repaired_on_first_save() {
    let fx = fixture(None).await;

    let doc = fx
        .service
        .write_config(json!({"bridge": {"port": "abc"}}))
        .await
        .unwrap();

    assert!((FALLBACK_PORT_MIN..=FALLBACK_PORT_MAX).contains(&doc.bridge.port));
    assert!(is_valid_username(&doc.bridge.username));
    assert!(doc.bridge.username.starts_with("0E:"));
    assert!(is_valid_pin(&doc.bridge.pin));
    assert!(doc.accessories.is_empty());
    assert!(doc.platforms.is_empty());

    let on_disk = fx.file_json().await;
    assert_eq!(on_disk["accessories"], json!([]));
    assert_eq!(on_disk["platforms"], json!([]));
    assert_eq!(on_disk["bridge"]["port"], json!(doc.bridge.port));

    // Nothing existed to back up.
    assert_eq!(fx.backup_count().await, 0);
}

#[tokio::test]
async fn test_saved_file_uses_four_space_indent() {
    let fx = fixture(None).await;
    fx.service.write_config(seed_document()).await.unwrap();

    let text = String::from_utf8(fx.file_bytes().await).unwrap();
    assert!(text.starts_with("{\n    \"bridge\": {\n        \"name\": \"Homebridge DDEE\",\n"));
    assert!(text.ends_with("}\n"));
}

#[tokio::test]
async fn test_malformed_identity_reuses_persisted_values() {
    let fx = fixture(Some(seed_document())).await;

    let mut doc = seed_document();
    doc["bridge"]["username"] = json!("not-a-mac");
    doc["bridge"]["pin"] = json!(12_345_678);
    let saved = fx.service.write_config(doc).await.unwrap();

    assert_eq!(saved.bridge.username, USERNAME);
    assert_eq!(saved.bridge.pin, PIN);
}

#[tokio::test]
async fn test_malformed_identity_without_history_is_generated() {
    let fx = fixture(None).await;

    let first = fx
        .service
        .write_config(json!({"bridge": {"username": "zz", "pin": "1-2-3"}}))
        .await
        .unwrap();
    assert!(is_valid_username(&first.bridge.username));
    assert!(is_valid_pin(&first.bridge.pin));

    // The generated values are now the persisted ones.
    let second = fx
        .service
        .write_config(json!({"bridge": {"username": "zz", "pin": "1-2-3"}}))
        .await
        .unwrap();
    assert_eq!(second.bridge.username, first.bridge.username);
    assert_eq!(second.bridge.pin, first.bridge.pin);
}

#[tokio::test]
async fn test_every_save_backs_up_the_previous_file() {
    let fx = fixture(Some(seed_document())).await;
    let before = fx.file_bytes().await;

    fx.service.write_config(seed_document()).await.unwrap();

    let backups = fx.service.list_backups().await.unwrap();
    assert_eq!(backups.len(), 1);
    let restored = fx.service.get_backup(&backups[0].id).await.unwrap();
    assert_eq!(restored, before);
}

#[tokio::test]
async fn test_write_then_read_round_trips() {
    let fx = fixture(None).await;

    let mut doc = seed_document();
    doc["mdns"] = json!({"interface": "eth0"});
    doc["ports"] = json!({"start": 52100, "end": 52150});
    let saved = fx.service.write_config(doc).await.unwrap();

    let read = fx.service.read_config().await.unwrap();
    assert_eq!(
        Value::Object(read.into_map()),
        serde_json::to_value(&saved).unwrap()
    );
    assert_eq!(saved.extra["ports"], json!({"start": 52100, "end": 52150}));
}

#[tokio::test]
async fn test_read_does_not_touch_identifiers() {
    let fx = fixture(Some(json!({
        "bridge": {"username": "bogus", "port": "abc"},
        "platforms": "nope"
    })))
    .await;

    let read = fx.service.read_config().await.unwrap();
    let map = read.as_map();
    assert_eq!(map["bridge"]["username"], json!("bogus"));
    assert_eq!(map["bridge"]["port"], json!("abc"));
    assert_eq!(map["platforms"], json!([]));
    assert_eq!(map["accessories"], json!([]));
}

#[tokio::test]
async fn test_read_of_missing_document_is_io_error() {
    let fx = fixture(None).await;
    let err = fx.service.read_config().await.unwrap_err();
    assert!(!err.is_client_error());
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_save_publishes_new_snapshot() {
    let fx = fixture(Some(seed_document())).await;
    let context = fx.service.context().clone();
    let mut rx = context.subscribe();

    assert_eq!(context.current().username(), Some(USERNAME));
    assert!(context.current().is_plugin_disabled("homebridge-old"));

    let mut doc = seed_document();
    doc["disabledPlugins"] = json!([]);
    doc["platforms"][0]["theme"] = json!("dark");
    fx.service.write_config(doc).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert!(!snapshot.is_plugin_disabled("homebridge-old"));
    assert_eq!(snapshot.ui_settings().unwrap()["theme"], json!("dark"));
    assert_eq!(snapshot.document(), &fx.file_json().await);
}

#[tokio::test]
async fn test_save_recreates_missing_backup_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = StoragePaths::from_storage(tmp.path());
    tokio::fs::write(
        paths.config_path(),
        serde_json::to_vec(&seed_document()).unwrap(),
    )
    .await
    .unwrap();

    // The backup directory has never been created.
    let backups = Arc::new(BackupStore::new(&paths));
    let store = ConfigStore::open(&paths, StoreSettings::default(), Arc::clone(&backups)).await;
    store.write(seed_document()).await.unwrap();

    assert!(paths.backup_path().is_dir());
    assert_eq!(backups.list_backups().await.unwrap().len(), 1);
    assert!(paths.config_path().is_file());
}

#[tokio::test]
async fn test_delete_all_backups() {
    let fx = fixture(Some(seed_document())).await;
    for _ in 0..3 {
        fx.service.write_config(seed_document()).await.unwrap();
    }
    assert_eq!(fx.backup_count().await, 3);

    assert_eq!(fx.service.delete_all_backups().await.unwrap(), 3);
    assert_eq!(fx.backup_count().await, 0);
    assert!(fx.config_path().is_file());
}

#[tokio::test]
async fn test_back_to_back_saves_keep_every_backup() {
    let fx = fixture(Some(seed_document())).await;
    for i in 0..20 {
        let mut doc = seed_document();
        doc["description"] = json!(format!("save {i}"));
        fx.service.write_config(doc).await.unwrap();
    }

    let backups = fx.service.list_backups().await.unwrap();
    assert_eq!(backups.len(), 20);
    // Newest backup holds the document from the second to last save.
    let newest: Value =
        serde_json::from_slice(&fx.service.get_backup(&backups[0].id).await.unwrap()).unwrap();
    assert_eq!(newest["description"], json!("save 18"));
}

#[tokio::test]
async fn test_save_succeeds_when_backup_cannot_be_taken() {
    let fx = fixture(Some(seed_document())).await;

    // A regular file where the backup directory was.
    let backup_dir = fx.paths.backup_path().to_path_buf();
    tokio::fs::remove_dir_all(&backup_dir).await.unwrap();
    tokio::fs::write(&backup_dir, b"").await.unwrap();

    let mut doc = seed_document();
    doc["description"] = json!("after");
    fx.service.write_config(doc).await.unwrap();

    assert_eq!(fx.file_json().await["description"], json!("after"));
    assert!(backup_dir.is_file());
}

#[tokio::test]
async fn test_missing_backup_is_not_found() {
    let fx = fixture(None).await;
    let err = fx.service.get_backup("1700000000000").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_open_migrates_legacy_backups() {
    let tmp = tempfile::tempdir().unwrap();
    for i in 0..3 {
        let name = format!("config.json.{}", 1_700_000_000_000_i64 + i);
        tokio::fs::write(tmp.path().join(name), b"{}").await.unwrap();
    }

    let paths = StoragePaths::from_storage(tmp.path());
    let service = uix_config::ConfigService::open(
        &paths,
        StoreSettings::default(),
        Arc::new(common::directory()),
    )
    .await;

    let backups = service.list_backups().await.unwrap();
    assert_eq!(backups.len(), 3);
    assert_eq!(backups[0].id, "1700000000002");
    assert!(!tmp.path().join("config.json.1700000000000").exists());
}

#[tokio::test]
async fn test_started_service_runs_retention() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = StoragePaths::from_storage(tmp.path());
    let service = uix_config::ConfigService::start(
        &paths,
        StoreSettings::default(),
        Arc::new(common::directory()),
    )
    .await;
    assert!(service.is_retention_running());
}
