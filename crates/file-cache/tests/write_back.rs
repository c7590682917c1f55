//! Integration tests for write gating, write-back sync, and release.

mod common;

use bytes::Bytes;
use file_cache::{AccessMode, FileCacheError};
use remote_store::RemoteStoreError;

#[tokio::test]
async fn test_write_on_read_only_handle_is_denied() {
    let env = common::setup().await;
    env.remote.push_content(None, b"read only".as_ref());

    let mut handle = env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap();
    let err = handle.write(0, b"nope").await.unwrap_err();
    assert!(matches!(err, FileCacheError::AccessDenied));
    assert!(!handle.modified());

    // Sync has nothing to push.
    env.cache.release("/a.txt", handle).await.unwrap();
    assert!(env.remote.uploads().is_empty());
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let env = common::setup().await;

    let mut handle = env
        .cache
        .open("/a.txt", AccessMode::ReadWrite, true)
        .await
        .unwrap();
    handle.write(0, b"payload").await.unwrap();

    env.cache.sync("/a.txt", &mut handle).await.unwrap();
    assert_eq!(env.remote.uploads().len(), 1);

    // Unmodified since the last sync: trivially succeeds, no upload.
    env.cache.sync("/a.txt", &mut handle).await.unwrap();
    assert_eq!(env.remote.uploads().len(), 1);

    // Release syncs once more; still nothing new to push.
    env.cache.release("/a.txt", handle).await.unwrap();
    assert_eq!(env.remote.uploads().len(), 1);
}

#[tokio::test]
async fn test_replace_open_write_sync_release_scenario() {
    let env = common::setup().await;

    let mut handle = env
        .cache
        .open("/a.txt", AccessMode::ReadWrite, true)
        .await
        .unwrap();

    // Provisional zero-length attributes are visible before any write.
    assert_eq!(env.attrs.get("/a.txt").unwrap().size, 0);

    handle.write(0, b"hello").await.unwrap();
    env.cache.sync("/a.txt", &mut handle).await.unwrap();
    env.cache.release("/a.txt", handle).await.unwrap();

    let recorded = env.attrs.recorded("/a.txt");
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].size, 0);
    assert_eq!(recorded[1].size, 5);

    assert_eq!(
        env.remote.uploads(),
        vec![("/a.txt".to_string(), Bytes::from_static(b"hello"))]
    );

    let entry = env.cache.metadata().get("/a.txt").await.unwrap().unwrap();
    assert!(entry.last_revalidated > 0);
    assert!(entry.local_filename.exists());
}

#[tokio::test]
async fn test_round_trip_through_revalidation() {
    let env = common::setup().await;
    let body = b"round trip bytes";

    let mut handle = env
        .cache
        .open("/a.txt", AccessMode::ReadWrite, true)
        .await
        .unwrap();
    handle.write(0, body).await.unwrap();
    env.cache.release("/a.txt", handle).await.unwrap();

    // Past the freshness window the remote is consulted again; it serves
    // what was uploaded.
    common::backdate_entry(&env.cache, "/a.txt").await;
    let uploaded = env.remote.uploads()[0].1.clone();
    env.remote.push_content(Some("\"v-next\""), uploaded);

    let mut reopened = env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap();
    assert_eq!(reopened.read(0, 64).await.unwrap(), body);
}

#[tokio::test]
async fn test_upload_failure_leaves_local_state_for_retry() {
    let env = common::setup().await;

    let mut handle = env
        .cache
        .open("/a.txt", AccessMode::ReadWrite, true)
        .await
        .unwrap();
    handle.write(0, b"precious").await.unwrap();

    env.remote.fail_uploads_with(503);
    let err = env.cache.sync("/a.txt", &mut handle).await.unwrap_err();
    assert!(matches!(
        err,
        FileCacheError::Remote(RemoteStoreError::UnexpectedStatus(503))
    ));

    // Content and modified flag untouched; a retry re-uploads.
    assert!(handle.modified());
    assert_eq!(handle.read(0, 64).await.unwrap(), b"precious");
    env.remote.allow_uploads();
    env.cache.sync("/a.txt", &mut handle).await.unwrap();
    assert_eq!(env.remote.uploads().len(), 1);
    env.cache.release("/a.txt", handle).await.unwrap();
}

#[tokio::test]
async fn test_release_reports_sync_failure_but_closes() {
    let env = common::setup().await;

    let mut handle = env
        .cache
        .open("/a.txt", AccessMode::Write, true)
        .await
        .unwrap();
    handle.write(0, b"doomed").await.unwrap();

    env.remote.fail_uploads_with(500);
    let err = env.cache.release("/a.txt", handle).await.unwrap_err();
    assert!(matches!(err, FileCacheError::Remote(_)));
    assert!(env.remote.uploads().is_empty());
}

#[tokio::test]
async fn test_sync_publishes_replacement_generation() {
    let env = common::setup().await;
    env.remote.push_content(Some("\"v1\""), b"old content".as_ref());

    // Seed an entry via a resolve-open.
    let seed = env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap();
    env.cache.release("/a.txt", seed).await.unwrap();
    let old_file = env
        .cache
        .metadata()
        .get("/a.txt")
        .await
        .unwrap()
        .unwrap()
        .local_filename;

    // Replace the content wholesale.
    let mut handle = env
        .cache
        .open("/a.txt", AccessMode::Write, true)
        .await
        .unwrap();
    handle.write(0, b"new content").await.unwrap();
    env.cache.release("/a.txt", handle).await.unwrap();

    // The entry now names the replacement file; the superseded generation
    // lost its directory entry; the validator carried over unchanged.
    let entry = env.cache.metadata().get("/a.txt").await.unwrap().unwrap();
    assert_ne!(entry.local_filename, old_file);
    assert!(!old_file.exists());
    assert!(entry.local_filename.exists());
    assert_eq!(entry.validator, "\"v1\"");
}

#[tokio::test]
async fn test_rw_session_writes_into_shared_generation() {
    let env = common::setup().await;
    env.remote.push_content(Some("\"v1\""), b"abcdef".as_ref());

    let mut handle = env
        .cache
        .open("/a.txt", AccessMode::ReadWrite, false)
        .await
        .unwrap();
    handle.write(0, b"XYZ").await.unwrap();
    env.cache.sync("/a.txt", &mut handle).await.unwrap();

    assert_eq!(
        env.remote.uploads(),
        vec![("/a.txt".to_string(), Bytes::from_static(b"XYZdef"))]
    );

    // The entry still points at the same generation file.
    let entry = env.cache.metadata().get("/a.txt").await.unwrap().unwrap();
    let mut reader = env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap();
    assert_eq!(reader.read(0, 64).await.unwrap(), b"XYZdef");
    assert_eq!(entry.validator, "\"v1\"");
    env.cache.release("/a.txt", handle).await.unwrap();
}
