//! Integration tests for zip ingestion

mod common;

use std::collections::HashSet;

use ::common::drive::{ArchiveViolation, DriveError, DriveLimits, ErrorKind, NodeKind};

#[tokio::test]
async fn test_unzip_builds_tree() {
    let env = common::setup_test_env().await;
    let archive = common::zip_bytes(&[
        ("readme.md", b"# hello"),
        ("src/", b""),
        ("src/main.rs", b"fn main() {}"),
        ("src/util/mod.rs", b"pub mod x;"),
        ("assets/logo.png", b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR"),
    ]);

    let report = env
        .drive
        .unzip(&env.owner, None, common::upload("project.zip", &archive))
        .await
        .unwrap();

    // root + src + util + assets folders, plus four files
    assert_eq!(report.created_count, 8);
    assert_eq!(report.created_nodes.len(), 8);
    assert_eq!(report.created_paths.len(), 4);

    let root = env.drive.ls(&env.owner, None).await.unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].id, report.root_id);
    assert!(root[0].name.starts_with("project_"));

    let top: Vec<_> = env
        .drive
        .ls(&env.owner, Some(report.root_id))
        .await
        .unwrap()
        .into_iter()
        .map(|n| (n.name, n.kind))
        .collect();
    assert!(top.contains(&("readme.md".to_string(), NodeKind::File)));
    assert!(top.contains(&("src".to_string(), NodeKind::Folder)));
    assert!(top.contains(&("assets".to_string(), NodeKind::Folder)));

    let all = env.drive.collect(&env.owner, Some(report.root_id)).await.unwrap();
    let logo = all.iter().find(|n| n.name == "logo.png").unwrap();
    assert_eq!(logo.mime.as_deref(), Some("image/png"));
    let main = all.iter().find(|n| n.name == "main.rs").unwrap();
    let (_, content) = env.drive.cat(&env.owner, main.id).await.unwrap();
    assert_eq!(common::read_all(content).await, b"fn main() {}");

    // blobs are namespaced by owner and extraction root
    let prefix = format!("owners/alice/{}/", report.root_id);
    assert!(report.created_paths.iter().all(|p| p.starts_with(&prefix)));
}

#[tokio::test]
async fn test_unzip_dedupes_directories() {
    let env = common::setup_test_env().await;
    let archive = common::zip_bytes(&[
        ("a/b/x.txt", b"x"),
        ("a/b/y.txt", b"y"),
        ("a/", b""),
        ("a/b/", b""),
    ]);

    let report = env
        .drive
        .unzip(&env.owner, None, common::upload("d.zip", &archive))
        .await
        .unwrap();

    let all = env.drive.collect(&env.owner, Some(report.root_id)).await.unwrap();
    assert_eq!(all.iter().filter(|n| n.name == "a").count(), 1);
    assert_eq!(all.iter().filter(|n| n.name == "b").count(), 1);
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_unzip_into_folder() {
    let env = common::setup_test_env().await;
    let dir = env.drive.mkdir(&env.owner, None, "uploads").await.unwrap();
    let archive = common::zip_bytes(&[("one.txt", b"1")]);

    let report = env
        .drive
        .unzip(&env.owner, Some(dir.id), common::upload("batch.zip", &archive))
        .await
        .unwrap();

    let parent = env.drive.parent(&env.owner, report.root_id).await.unwrap();
    assert_eq!(parent.unwrap().id, dir.id);
}

#[tokio::test]
async fn test_unzip_rejects_traversal_without_side_effects() {
    let env = common::setup_test_env().await;
    let archive = common::zip_bytes(&[("ok.txt", b"fine"), ("../../evil.txt", b"pwned")]);

    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("evil.zip", &archive))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Archive(ArchiveViolation::Traversal(_))));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert!(env.nodes.is_empty());
    assert!(env.blobs.live().is_empty());
}

#[tokio::test]
async fn test_unzip_extraction_cap_rolls_back() {
    let limits = DriveLimits {
        max_extracted_bytes: 10,
        ..DriveLimits::default()
    };
    let env = common::setup_with(limits, None).await;
    let archive = common::zip_bytes(&[
        ("dir/first.txt", b"123456"),
        ("dir/second.txt", b"7890ab"),
    ]);

    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("big.zip", &archive))
        .await
        .unwrap_err();
    assert!(err.was_rolled_back());
    assert_eq!(err.root_kind(), ErrorKind::ResourceExhausted);
    assert!(matches!(
        err,
        DriveError::RolledBack(ref cause)
            if matches!(**cause, DriveError::Archive(ArchiveViolation::ExtractTooLarge { limit: 10 }))
    ));

    assert!(env.nodes.is_empty());
    assert!(env.blobs.live().is_empty());
}

#[tokio::test]
async fn test_unzip_single_entry_over_cap() {
    let limits = DriveLimits {
        max_extracted_bytes: 1024,
        ..DriveLimits::default()
    };
    let env = common::setup_with(limits, None).await;
    // compresses to almost nothing but inflates past the cap
    let bomb = vec![0u8; 64 * 1024];
    let archive = common::zip_bytes(&[("zeros.bin", &bomb)]);
    assert!(archive.len() < 1024);

    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("bomb.zip", &archive))
        .await
        .unwrap_err();
    assert_eq!(err.root_kind(), ErrorKind::ResourceExhausted);
    assert!(env.nodes.is_empty());
    assert!(env.blobs.live().is_empty());
}

#[tokio::test]
async fn test_unzip_blob_failure_rolls_back_everything() {
    let env = common::setup_with(DriveLimits::default(), Some(2)).await;
    let archive = common::zip_bytes(&[
        ("a/1.txt", b"1"),
        ("a/b/2.txt", b"2"),
        ("c/3.txt", b"3"),
    ]);

    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("x.zip", &archive))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PartialFailureRecovered);
    assert_eq!(err.root_kind(), ErrorKind::StoreFailure);

    assert!(env.nodes.is_empty());
    assert!(env.blobs.live().is_empty());
}

#[tokio::test]
async fn test_unzip_entry_count_cap() {
    let limits = DriveLimits {
        max_archive_entries: 2,
        ..DriveLimits::default()
    };
    let env = common::setup_with(limits, None).await;
    let archive = common::zip_bytes(&[("1", b"1"), ("2", b"2"), ("3", b"3")]);

    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("many.zip", &archive))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DriveError::Archive(ArchiveViolation::TooManyEntries { count: 3, limit: 2 })
    ));
    assert!(env.nodes.is_empty());
}

#[tokio::test]
async fn test_unzip_archive_size_cap() {
    let limits = DriveLimits {
        max_archive_bytes: 64,
        ..DriveLimits::default()
    };
    let env = common::setup_with(limits, None).await;
    let archive = common::zip_bytes(&[("a.txt", b"aaaa"), ("b.txt", b"bbbb")]);
    assert!(archive.len() > 64);

    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("a.zip", &archive))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DriveError::Archive(ArchiveViolation::ArchiveTooLarge { limit: 64 })
    ));
    assert!(env.nodes.is_empty());
}

#[tokio::test]
async fn test_unzip_malformed_and_empty() {
    let env = common::setup_test_env().await;

    let garbage = env
        .drive
        .unzip(&env.owner, None, common::upload("junk.zip", b"definitely not a zip"))
        .await
        .unwrap_err();
    assert!(matches!(garbage, DriveError::Archive(ArchiveViolation::Malformed(_))));

    let empty = env
        .drive
        .unzip(&env.owner, None, common::upload("empty.zip", b""))
        .await
        .unwrap_err();
    assert!(matches!(empty, DriveError::Archive(ArchiveViolation::Empty)));
    assert!(env.nodes.is_empty());
}

#[tokio::test]
async fn test_unzip_skips_symlinks_and_dot_entries() {
    let env = common::setup_test_env().await;

    let report = env
        .drive
        .unzip(&env.owner, None, common::upload("links.zip", &common::zip_with_symlink()))
        .await
        .unwrap();
    let names: HashSet<_> = env
        .drive
        .collect(&env.owner, Some(report.root_id))
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(names, HashSet::from(["real.txt".to_string()]));

    let archive = common::zip_bytes(&[("./", b""), ("./kept.txt", b"k")]);
    let report = env
        .drive
        .unzip(&env.owner, None, common::upload("dots.zip", &archive))
        .await
        .unwrap();
    assert_eq!(report.created_count, 2);
    assert_eq!(report.created_nodes[1].name, "kept.txt");
}

#[tokio::test]
async fn test_unzip_segment_too_long() {
    let env = common::setup_test_env().await;
    let long = format!("dir/{}.txt", "n".repeat(300));
    let archive = common::zip_bytes(&[(long.as_str(), b"x")]);

    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("long.zip", &archive))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DriveError::Archive(ArchiveViolation::SegmentTooLong { .. })
    ));
}

#[tokio::test]
async fn test_unzip_node_failure_rolls_back_everything() {
    // root, a, a/1.txt and b succeed; the node for b/2.txt fails after its
    // blob is already written
    let env = common::setup_with_flaky_nodes(4).await;
    let archive = common::zip_bytes(&[("a/1.txt", b"1"), ("b/2.txt", b"2")]);

    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("n.zip", &archive))
        .await
        .unwrap_err();
    assert!(err.was_rolled_back());
    assert_eq!(err.root_kind(), ErrorKind::StoreFailure);

    assert!(env.nodes.is_empty());
    assert!(env.blobs.live().is_empty());
}

#[tokio::test]
async fn test_unzip_rejects_conflicting_entries() {
    let env = common::setup_test_env().await;

    let duplicate = common::zip_bytes(&[("dup.txt", b"first"), ("./dup.txt", b"second")]);
    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("dup.zip", &duplicate))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Archive(ArchiveViolation::PathConflict(_))));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let shadowed = common::zip_bytes(&[("a", b"file"), ("a/b.txt", b"nested")]);
    let err = env
        .drive
        .unzip(&env.owner, None, common::upload("shadow.zip", &shadowed))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Archive(ArchiveViolation::PathConflict(_))));

    assert!(env.nodes.is_empty());
    assert!(env.blobs.live().is_empty());
}
