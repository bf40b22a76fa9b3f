//! Integration tests for owner isolation across every operation

mod common;

use ::common::drive::{ErrorKind, OwnerId};

#[tokio::test]
async fn test_owner_cannot_touch_foreign_nodes() {
    let env = common::setup_test_env().await;
    let mallory = OwnerId::new("mallory");

    let dir = env.drive.mkdir(&env.owner, None, "secret").await.unwrap();
    let file = env
        .drive
        .add(&env.owner, Some(dir.id), common::upload("key.pem", b"-----"), None)
        .await
        .unwrap();
    let mine = env.drive.mkdir(&mallory, None, "mine").await.unwrap();

    let denied = |kind: ErrorKind| matches!(kind, ErrorKind::Forbidden | ErrorKind::NotFound);

    assert!(denied(env.drive.ls(&mallory, Some(dir.id)).await.unwrap_err().kind()));
    let Err(err) = env.drive.cat(&mallory, file.id).await else {
        panic!("foreign file was readable");
    };
    assert!(denied(err.kind()));
    assert!(denied(env.drive.parent(&mallory, file.id).await.unwrap_err().kind()));
    assert!(denied(env.drive.collect(&mallory, Some(dir.id)).await.unwrap_err().kind()));
    assert!(denied(env.drive.stats(&mallory, Some(dir.id), true).await.unwrap_err().kind()));
    assert!(denied(env.drive.rm(&mallory, file.id).await.unwrap_err().kind()));
    assert!(denied(env.drive.mv(&mallory, file.id, Some(mine.id)).await.unwrap_err().kind()));
    assert!(denied(
        env.drive
            .mkdir(&mallory, Some(dir.id), "implant")
            .await
            .unwrap_err()
            .kind()
    ));
    assert!(denied(
        env.drive
            .add(&mallory, Some(dir.id), common::upload("x", b"x"), None)
            .await
            .unwrap_err()
            .kind()
    ));
    let archive = common::zip_bytes(&[("a.txt", b"a")]);
    assert!(denied(
        env.drive
            .unzip(&mallory, Some(dir.id), common::upload("a.zip", &archive))
            .await
            .unwrap_err()
            .kind()
    ));

    // nothing of alice's leaks into mallory's views or was changed
    let theirs = env.drive.collect(&mallory, None).await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].id, mine.id);

    let (_, content) = env.drive.cat(&env.owner, file.id).await.unwrap();
    assert_eq!(common::read_all(content).await, b"-----");
    assert_eq!(env.drive.collect(&env.owner, None).await.unwrap().len(), 2);
}
