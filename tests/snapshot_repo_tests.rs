// SnapshotRepo tests: connect, init, save, list, bounds, samples, prune

mod common;

use common::*;
use serde_json::json;
use tempfile::TempDir;
use vmidle::models::ControlPlaneMarker;
use vmidle::snapshot_repo::{RawSnapshot, SnapshotRepo};

async fn open_repo(dir: &TempDir) -> SnapshotRepo {
    let path = dir.path().join("snapshots.db");
    let repo = SnapshotRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    repo
}

#[tokio::test]
async fn snapshot_repo_connect_and_init() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    // Second init is no-op (IF NOT EXISTS)
    repo.init().await.unwrap();
    assert!(repo.list_vms().await.unwrap().is_empty());
    assert!(repo.time_bounds().await.unwrap().is_none());
}

#[tokio::test]
async fn snapshot_repo_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/deeper/snapshots.db");
    let repo = SnapshotRepo::connect(path.to_str().unwrap(), 1).await.unwrap();
    repo.init().await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn snapshot_repo_save_and_read_samples_in_order() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;

    let mut history = raw_history("vm-1", 3, 60, 0.5, 100);
    history.reverse();
    repo.save_snapshots(&history).await.unwrap();

    let samples = repo.get_vm_samples("vm-1", None, None).await.unwrap();
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].captured_at, at(0));
    assert_eq!(samples[2].captured_at, at(120));
    assert!(approx(samples[2].cpu_total().unwrap(), 60.0));
    assert!(approx(samples[2].disk_total().unwrap(), 12_000.0));
    assert!(approx(samples[2].uptime_seconds, 120.0));
}

#[tokio::test]
async fn snapshot_repo_filters_by_vm_and_time() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    repo.save_snapshots(&raw_history("vm-b", 5, 60, 0.1, 0)).await.unwrap();
    repo.save_snapshots(&raw_history("vm-a", 2, 60, 0.1, 0)).await.unwrap();

    assert_eq!(repo.list_vms().await.unwrap(), vec!["vm-a", "vm-b"]);

    let window = repo
        .get_vm_samples("vm-b", Some(at(60)), Some(at(180)))
        .await
        .unwrap();
    assert_eq!(window.len(), 3);
    assert_eq!(window[0].captured_at, at(60));

    let from_only = repo.get_vm_samples("vm-b", Some(at(200)), None).await.unwrap();
    assert_eq!(from_only.len(), 1);

    let (first, last) = repo.time_bounds().await.unwrap().unwrap();
    assert_eq!(first, at(0));
    assert_eq!(last, at(240));
}

#[tokio::test]
async fn snapshot_repo_save_single_snapshot_with_marker() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    repo.save_snapshot("vm-1", at(0), &json!({ "itemNotFound": { "code": 404 } }))
        .await
        .unwrap();

    let samples = repo.get_vm_samples("vm-1", None, None).await.unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].marker, Some(ControlPlaneMarker::ItemNotFound));
    assert!(samples[0].cpu_core_times.is_none());
}

#[tokio::test]
async fn snapshot_repo_skips_undecodable_documents() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    repo.save_snapshot("vm-1", at(0), &json!([1, 2, 3])).await.unwrap();
    repo.save_snapshot("vm-1", at(60), &raw_doc(60.0, 1.0, 0, 0))
        .await
        .unwrap();

    let samples = repo.get_vm_samples("vm-1", None, None).await.unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].captured_at, at(60));
}

#[tokio::test]
async fn snapshot_repo_save_empty_no_op() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    repo.save_snapshots(&[]).await.unwrap();
    assert!(repo.list_vms().await.unwrap().is_empty());
}

#[tokio::test]
async fn snapshot_repo_prune_old_data() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    repo.save_snapshots(&raw_history("vm-1", 10, 60, 0.1, 0)).await.unwrap();

    let removed = repo.prune_before(at(300)).await.unwrap();
    assert_eq!(removed, 5);
    repo.vacuum().await.unwrap();

    let samples = repo.get_vm_samples("vm-1", None, None).await.unwrap();
    assert_eq!(samples.len(), 5);
    assert_eq!(samples[0].captured_at, at(300));
}

#[test]
fn raw_snapshot_from_json_line() {
    let line = r#"{"vm_id":"vm-9","captured_at":"2024-03-01T12:00:00Z","data":{"uptime":5}}"#;
    let s = RawSnapshot::from_json_line(line).unwrap();
    assert_eq!(s.vm_id, "vm-9");
    assert_eq!(s.captured_at, t0());
    assert_eq!(s.data["uptime"], 5);

    assert!(RawSnapshot::from_json_line("{\"vm_id\":1}").is_err());
}
