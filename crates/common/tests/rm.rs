//! Integration tests for cascading delete

mod common;

use ::common::drive::{DriveError, NodeStore, OwnerId};
use uuid::Uuid;

#[tokio::test]
async fn test_rm_file_removes_blob() {
    let env = common::setup_test_env().await;
    let file = env
        .drive
        .add(&env.owner, None, common::upload("f.txt", b"bytes"), None)
        .await
        .unwrap();
    let path = file.blob_path.clone().unwrap();
    assert_eq!(env.drive.blobs().stat(&path).await.unwrap(), Some(5));

    assert_eq!(env.drive.rm(&env.owner, file.id).await.unwrap(), 1);
    assert_eq!(env.drive.blobs().stat(&path).await.unwrap(), None);
    assert!(env.nodes.is_empty());

    let again = env.drive.cat(&env.owner, file.id).await;
    assert!(matches!(again, Err(DriveError::NotFound(_))));
}

#[tokio::test]
async fn test_rm_folder_cascades() {
    let env = common::setup_test_env().await;
    let top = env.drive.mkdir(&env.owner, None, "top").await.unwrap();
    let mid = env.drive.mkdir(&env.owner, Some(top.id), "mid").await.unwrap();
    let deep = env.drive.mkdir(&env.owner, Some(mid.id), "deep").await.unwrap();
    for (parent, name) in [(top.id, "a"), (mid.id, "b"), (deep.id, "c")] {
        env.drive
            .add(&env.owner, Some(parent), common::upload(name, name.as_bytes()), None)
            .await
            .unwrap();
    }
    let keep = env.drive.mkdir(&env.owner, None, "keep").await.unwrap();
    assert_eq!(env.blobs.live().len(), 3);

    let removed = env.drive.rm(&env.owner, top.id).await.unwrap();
    assert_eq!(removed, 6);
    assert!(env.blobs.live().is_empty());

    for id in [top.id, mid.id, deep.id] {
        let children = env.nodes.list_children(&env.owner, Some(id)).await.unwrap();
        assert!(children.is_empty());
    }
    let remaining = env.nodes.all_for(&env.owner);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);
}

#[tokio::test]
async fn test_rm_tolerates_missing_blob() {
    let env = common::setup_test_env().await;
    let dir = env.drive.mkdir(&env.owner, None, "d").await.unwrap();
    let file = env
        .drive
        .add(&env.owner, Some(dir.id), common::upload("f", b"1"), None)
        .await
        .unwrap();
    env.drive
        .blobs()
        .delete(file.blob_path.as_deref().unwrap())
        .await
        .unwrap();

    assert_eq!(env.drive.rm(&env.owner, dir.id).await.unwrap(), 2);
    assert!(env.nodes.is_empty());
}

#[tokio::test]
async fn test_rm_checks_owner_and_existence() {
    let env = common::setup_test_env().await;
    let bob = OwnerId::new("bob");
    let theirs = env.drive.mkdir(&bob, None, "b").await.unwrap();

    let forbidden = env.drive.rm(&env.owner, theirs.id).await;
    assert!(matches!(forbidden, Err(DriveError::Forbidden(_))));
    assert_eq!(env.nodes.len(), 1);

    let missing = env.drive.rm(&env.owner, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(DriveError::NotFound(_))));
}

#[tokio::test]
async fn test_rm_terminates_on_cyclic_records() {
    let env = common::setup_test_env().await;
    let a = env.drive.mkdir(&env.owner, None, "a").await.unwrap();
    let b = env.drive.mkdir(&env.owner, Some(a.id), "b").await.unwrap();

    // corrupt the store: a now claims b as its parent, forming a loop
    let mut looped = a.clone();
    looped.parent_id = Some(b.id);
    env.nodes.insert(looped);

    let collected = env.drive.collect(&env.owner, Some(a.id)).await.unwrap();
    let mut ids: Vec<_> = collected.iter().map(|n| n.id).collect();
    ids.sort();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(ids, expected);

    env.drive.rm(&env.owner, a.id).await.unwrap();
    assert!(env.nodes.is_empty());
}
