//! End-to-end scenarios spanning the scan → audit → clean pipeline that no
//! single module's unit tests cover on their own.

use std::fs;
use std::time::Duration;

use chrono::Utc;
use disk_cleanup_core::{CleanableItem, Cleaner, CoreConfig, DeleteMode, ProcessSnapshot, SecurityAuditor};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn item(path: std::path::PathBuf, size: u64, safety_score: u8) -> CleanableItem {
    CleanableItem {
        id: Uuid::new_v4(),
        name: path.file_name().unwrap().to_string_lossy().to_string(),
        path,
        category: "userCaches".to_string(),
        size,
        mtime: Utc::now(),
        atime: Utc::now(),
        ctime: Utc::now(),
        safety_score,
        content_hash: None,
    }
}

/// A critical-path item is never deleted regardless of its safety score.
#[tokio::test]
async fn critical_path_rejection_is_independent_of_safety_score() {
    let cleaner = Cleaner::new();
    let config = CoreConfig::default();
    let target = item(std::path::PathBuf::from("/System/foo"), 1024, 100);

    let result = cleaner
        .clean(&[target], &config, false, &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.deleted.is_empty());
    assert_eq!(result.freed_space, 0);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].code, "denied");
}

/// A sensitive file is denied unless the caller has confirmed, and
/// `dry_run` returns the same denial as `clean`.
#[tokio::test]
async fn sensitive_file_denied_without_confirmation_in_both_modes() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("id_rsa");
    fs::write(&path, b"-----BEGIN KEY-----").unwrap();

    let cleaner = Cleaner::new();
    let mut config = CoreConfig::default();
    config.min_safety_score = 0;
    let target = item(path.clone(), 20, 95);

    let dry = cleaner
        .dry_run(&[target.clone()], &config, false, &CancellationToken::new())
        .await
        .unwrap();
    assert!(dry.deleted.is_empty());
    assert_eq!(dry.failed[0].code, "denied");
    assert!(path.exists());

    let real = cleaner
        .clean(&[target], &config, false, &CancellationToken::new())
        .await
        .unwrap();
    assert!(real.deleted.is_empty());
    assert!(path.exists());
}

/// A walker finds cache files under a fixture directory with the sizes on
/// disk, `ScanResults` totals them correctly, and cleaning frees exactly
/// their total size.
#[tokio::test]
async fn basic_cache_cleanup_frees_the_scanned_bytes() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a"), vec![0u8; 10 * 1024 * 1024]).unwrap();
    fs::write(temp.path().join("b"), vec![0u8; 5 * 1024 * 1024]).unwrap();
    fs::write(temp.path().join("kept.txt"), vec![0u8; 1024 * 1024]).unwrap();

    let walker =
        disk_cleanup_core::walker::Walker::new(temp.path().to_path_buf(), "*", Default::default());
    let records = walker.walk(&CancellationToken::new());
    assert_eq!(records.len(), 3);

    // Scored directly (rather than through the heuristic scorer) so this
    // scenario stays independent of the scorer's path-contribution rules —
    // cache items come in safe, `kept.txt` comes in unsafe, matching the
    // fixture's intent.
    let items: Vec<CleanableItem> = records
        .into_iter()
        .map(|record| {
            let safety_score = if record.path.extension().is_some() { 20 } else { 90 };
            item(record.path, record.size, safety_score)
        })
        .collect();

    let results = disk_cleanup_core::ScanResults::from_items(items.clone(), Vec::new());
    assert_eq!(results.total_size, 16 * 1024 * 1024);
    assert_eq!(results.safe_total_size, 15 * 1024 * 1024);

    let cleaner = Cleaner::new();
    let mut config = CoreConfig::default();
    config.delete_mode = DeleteMode::Unlink;
    let result = cleaner
        .clean(&items, &config, false, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.freed_space, 15 * 1024 * 1024);
    assert!(temp.path().join("kept.txt").exists());
}

/// Deleting the same items twice produces an empty `deleted` list on the
/// second call.
#[tokio::test]
async fn idempotent_clean_is_empty_on_second_pass() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cache.bin");
    fs::write(&path, vec![0u8; 2048]).unwrap();

    let cleaner = Cleaner::new();
    let mut config = CoreConfig::default();
    config.min_safety_score = 0;
    config.delete_mode = DeleteMode::Unlink;
    let target = item(path.clone(), 2048, 95);

    let first = cleaner
        .clean(&[target.clone()], &config, false, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.deleted.len(), 1);
    assert!(!path.exists());

    let second = cleaner
        .clean(&[target], &config, false, &CancellationToken::new())
        .await
        .unwrap();
    assert!(second.deleted.is_empty());
    assert_eq!(second.failed.len(), 1);
}

/// A cancelled scan returns within the configured shutdown budget rather
/// than running to completion.
#[tokio::test]
async fn cancelled_scan_returns_quickly() {
    let temp = TempDir::new().unwrap();
    for i in 0..50 {
        fs::write(temp.path().join(format!("f{i}")), vec![0u8; 1024]).unwrap();
    }

    let token = CancellationToken::new();
    token.cancel();

    let walker =
        disk_cleanup_core::walker::Walker::new(temp.path().to_path_buf(), "*", Default::default());
    let started = std::time::Instant::now();
    let records = walker.walk(&token);
    assert!(records.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));
}

/// A re-audit immediately before unlink still denies a path that has become
/// critical between scan and deletion attempt (the TOCTOU guard),
/// independent of the originally-scanned safety score.
#[tokio::test]
async fn reaudit_denies_a_path_made_critical_after_scan() {
    let auditor = SecurityAuditor::new();
    let config = CoreConfig::default();
    let processes = ProcessSnapshot::empty();
    let target = item(std::path::PathBuf::from("/etc/hosts"), 10, 100);

    let result = auditor.reaudit(&target, &config, false, &processes);
    assert!(result.is_err());
}
