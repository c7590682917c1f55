//! Integration tests for generation replacement.

mod common;

use file_cache::AccessMode;

#[tokio::test]
async fn test_replacement_leaves_old_reader_intact() {
    let env = common::setup().await;
    env.remote.push_content(Some("\"v1\""), b"generation one".as_ref());

    let mut old_reader = env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap();
    assert_eq!(old_reader.read(0, 4).await.unwrap(), b"gene");

    let old_file = env
        .cache
        .metadata()
        .get("/a.txt")
        .await
        .unwrap()
        .unwrap()
        .local_filename;

    // Remote content changed; force a revalidation that replaces the
    // generation.
    common::backdate_entry(&env.cache, "/a.txt").await;
    env.remote.push_content(Some("\"v2\""), b"generation two!".as_ref());
    let mut new_reader = env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap();

    // The new entry points at a new file and the old directory entry is
    // gone.
    let entry = env.cache.metadata().get("/a.txt").await.unwrap().unwrap();
    assert_ne!(entry.local_filename, old_file);
    assert_eq!(entry.validator, "\"v2\"");
    assert!(!old_file.exists());
    assert!(entry.local_filename.exists());

    // The reader attached before the swap still sees generation one,
    // complete and unmodified.
    assert_eq!(old_reader.read(0, 64).await.unwrap(), b"generation one");
    assert_eq!(new_reader.read(0, 64).await.unwrap(), b"generation two!");
}

#[tokio::test]
async fn test_refresh_rewrites_validator() {
    let env = common::setup().await;
    env.remote.push_content(Some("\"v1\""), b"one".as_ref());
    env.cache
        .release(
            "/a.txt",
            env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap(),
        )
        .await
        .unwrap();

    common::backdate_entry(&env.cache, "/a.txt").await;
    env.remote.push_content(Some("\"v2\""), b"two".as_ref());
    env.cache
        .release(
            "/a.txt",
            env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap(),
        )
        .await
        .unwrap();

    common::backdate_entry(&env.cache, "/a.txt").await;
    env.remote.push_not_modified();
    env.cache
        .release(
            "/a.txt",
            env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap(),
        )
        .await
        .unwrap();

    // The third fetch was preconditioned on the refreshed validator.
    assert_eq!(env.remote.sent_validators()[2], Some("\"v2\"".to_string()));
}

#[tokio::test]
async fn test_missing_validator_means_unconditional_fetch() {
    let env = common::setup().await;
    env.remote.push_content(None, b"no etag here".as_ref());
    env.cache
        .release(
            "/a.txt",
            env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap(),
        )
        .await
        .unwrap();

    common::backdate_entry(&env.cache, "/a.txt").await;
    env.remote.push_content(None, b"still none".as_ref());
    env.cache
        .release(
            "/a.txt",
            env.cache.open("/a.txt", AccessMode::Read, false).await.unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(env.remote.sent_validators(), vec![None, None]);
}
