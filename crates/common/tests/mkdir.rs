//! Integration tests for folder creation and listing

mod common;

use ::common::drive::{DriveError, ErrorKind, NodeKind, OwnerId};
use uuid::Uuid;

#[tokio::test]
async fn test_mkdir_at_root() {
    let env = common::setup_test_env().await;

    let docs = env.drive.mkdir(&env.owner, None, "docs").await.unwrap();
    assert_eq!(docs.kind, NodeKind::Folder);
    assert_eq!(docs.parent_id, None);
    assert_eq!(docs.owner_id, env.owner);
    assert!(docs.blob_path.is_none());

    let root = env.drive.ls(&env.owner, None).await.unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].id, docs.id);
}

#[tokio::test]
async fn test_mkdir_nested() {
    let env = common::setup_test_env().await;

    let a = env.drive.mkdir(&env.owner, None, "a").await.unwrap();
    let b = env.drive.mkdir(&env.owner, Some(a.id), "b").await.unwrap();
    assert_eq!(b.parent_id, Some(a.id));

    let children = env.drive.ls(&env.owner, Some(a.id)).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "b");
    // the nested folder doesn't show up at the root
    assert_eq!(env.drive.ls(&env.owner, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ls_is_ordered_by_creation() {
    let env = common::setup_test_env().await;
    let mut expected = Vec::new();
    for name in ["one", "two", "three", "four"] {
        expected.push(env.drive.mkdir(&env.owner, None, name).await.unwrap().id);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let listed: Vec<_> = env
        .drive
        .ls(&env.owner, None)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn test_mkdir_invalid_names() {
    let env = common::setup_test_env().await;

    let long = "x".repeat(256);
    for name in ["", "   ", "a/b", "..", long.as_str()] {
        let err = env.drive.mkdir(&env.owner, None, name).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "name {name:?}");
    }
}

#[tokio::test]
async fn test_mkdir_missing_parent() {
    let env = common::setup_test_env().await;
    let result = env.drive.mkdir(&env.owner, Some(Uuid::new_v4()), "x").await;
    assert!(matches!(result, Err(DriveError::NotFound(_))));
}

#[tokio::test]
async fn test_mkdir_under_file_rejected() {
    let env = common::setup_test_env().await;
    let file = env
        .drive
        .add(&env.owner, None, common::upload("f.txt", b"hi"), None)
        .await
        .unwrap();

    let result = env.drive.mkdir(&env.owner, Some(file.id), "x").await;
    assert!(matches!(result, Err(DriveError::InvalidInput(_))));

    let result = env.drive.ls(&env.owner, Some(file.id)).await;
    assert!(matches!(result, Err(DriveError::InvalidInput(_))));
}

#[tokio::test]
async fn test_mkdir_under_foreign_folder_forbidden() {
    let env = common::setup_test_env().await;
    let bob = OwnerId::new("bob");
    let theirs = env.drive.mkdir(&bob, None, "private").await.unwrap();

    let result = env.drive.mkdir(&env.owner, Some(theirs.id), "sneaky").await;
    assert!(matches!(result, Err(DriveError::Forbidden(id)) if id == theirs.id));
    assert!(env.drive.ls(&bob, Some(theirs.id)).await.unwrap().is_empty());
}
