use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::auditor::SecurityAuditor;
use crate::backup::BackupCoordinator;
use crate::config::{CoreConfig, DeleteMode};
use crate::error::{CoreError, CoreResult};
use crate::process_snapshot::ProcessSnapshot;
use crate::types::{CleanableItem, CleanResult, FailedDeletion};

const DEFAULT_GLOBAL_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(30);
/// Pre-flight dependency scan per item; conservative so it never dominates
/// the batch timeout.
const DEPENDENCY_SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes deletions safely, in parallel, with verification and
/// cancellation. `dry_run` and `clean` share the same filter → audit →
/// (mutate) pipeline so behavioral parity between the two is structural.
pub struct Cleaner {
    auditor: SecurityAuditor,
    backup: Option<Arc<BackupCoordinator>>,
}

impl Cleaner {
    pub fn new() -> Self {
        Cleaner {
            auditor: SecurityAuditor::new(),
            backup: None,
        }
    }

    pub fn with_backup(backup: Arc<BackupCoordinator>) -> Self {
        Cleaner {
            auditor: SecurityAuditor::new(),
            backup: Some(backup),
        }
    }

    pub async fn dry_run(
        &self,
        items: &[CleanableItem],
        config: &CoreConfig,
        confirmed: bool,
        token: &CancellationToken,
    ) -> CoreResult<CleanResult> {
        self.run(items, config, confirmed, token, false).await
    }

    pub async fn clean(
        &self,
        items: &[CleanableItem],
        config: &CoreConfig,
        confirmed: bool,
        token: &CancellationToken,
    ) -> CoreResult<CleanResult> {
        self.run(items, config, confirmed, token, true).await
    }

    async fn run(
        &self,
        items: &[CleanableItem],
        config: &CoreConfig,
        confirmed: bool,
        token: &CancellationToken,
        mutate: bool,
    ) -> CoreResult<CleanResult> {
        // Step 1: filter by minimum safety score.
        let candidates: Vec<CleanableItem> = items
            .iter()
            .filter(|item| item.safety_score >= config.min_safety_score)
            .cloned()
            .collect();

        // Step 2: pre-deletion snapshot, if configured.
        if mutate && config.auto_backup {
            if let Some(backup) = &self.backup {
                let snapshot = BackupCoordinator::snapshot_of(&candidates);
                if let Err(err) = backup.backup(&snapshot).await {
                    if config.require_backup_on_delete {
                        return Err(err);
                    }
                    log::warn!("pre-deletion backup failed, continuing without one: {err}");
                }
            } else if config.require_backup_on_delete {
                return Err(CoreError::Validation(
                    "auto_backup and require_backup_on_delete are set but no backup coordinator is configured".into(),
                ));
            }
        }

        let processes = ProcessSnapshot::capture().await;
        let semaphore = Arc::new(Semaphore::new(config.parallel_workers.max(1)));
        let mut tasks = Vec::with_capacity(candidates.len());

        for item in candidates {
            let permit = Arc::clone(&semaphore);
            let token = token.clone();
            let processes = processes.clone();
            let auditor_config = config.clone();
            tasks.push(async move {
                let Ok(_permit) = permit.acquire_owned().await else {
                    return Err((item, CoreError::Cancelled));
                };
                if token.is_cancelled() {
                    return Err((item, CoreError::Cancelled));
                }
                process_one(&item, &auditor_config, confirmed, &processes, mutate).await
            });
        }

        let global = async {
            let results = futures::future::join_all(tasks).await;
            CoreResult::Ok(results)
        };

        let results = match timeout(DEFAULT_GLOBAL_TIMEOUT, global).await {
            Ok(results) => results?,
            Err(_) => {
                token.cancel();
                return Err(CoreError::Cancelled);
            }
        };

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        let mut freed_space = 0u64;

        for result in results {
            match result {
                Ok(item) => {
                    freed_space += item.size;
                    deleted.push(item);
                }
                Err((item, err)) => {
                    let code = err.code();
                    failed.push(FailedDeletion {
                        item,
                        error: err.to_string(),
                        code,
                    });
                }
            }
        }

        Ok(CleanResult {
            deleted,
            failed,
            freed_space,
        })
    }

    /// Non-blocking pre-flight warning: finds symlinks elsewhere on disk
    /// that reference `path`. Never denies; callers may surface this as a
    /// confirmation prompt. Also run automatically, per item, inside
    /// `clean` itself (see `process_one`) so a caller who never calls this
    /// directly still gets the warning logged before deletion.
    pub async fn scan_dependencies(&self, path: &Path) -> Vec<PathBuf> {
        scan_dependencies(path).await
    }
}

async fn scan_dependencies(path: &Path) -> Vec<PathBuf> {
    let mut roots = vec![PathBuf::from("/Applications"), PathBuf::from("/Library")];
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join("Applications"));
        roots.push(home.join("Library"));
    }

    let mut dependents = Vec::new();
    for root in roots {
        if !root.exists() {
            continue;
        }
        let search = Command::new("find")
            .arg(&root)
            .arg("-maxdepth")
            .arg("6")
            .arg("-lname")
            .arg(path)
            .output();
        match timeout(DEPENDENCY_SCAN_TIMEOUT, search).await {
            Ok(Ok(output)) => {
                for line in String::from_utf8_lossy(&output.stdout).lines() {
                    dependents.push(PathBuf::from(line));
                }
            }
            _ => continue,
        }
    }
    dependents
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new()
    }
}

async fn process_one(
    item: &CleanableItem,
    config: &CoreConfig,
    confirmed: bool,
    processes: &ProcessSnapshot,
    mutate: bool,
) -> Result<CleanableItem, (CleanableItem, CoreError)> {
    let auditor = SecurityAuditor::new();
    let attempt = timeout(DEFAULT_ITEM_TIMEOUT, async {
        if mutate {
            let dependents = scan_dependencies(&item.path).await;
            if !dependents.is_empty() {
                log::warn!(
                    "{} symlink(s) elsewhere reference {}, deleting anyway: {:?}",
                    dependents.len(),
                    item.path.display(),
                    dependents
                );
            }
        }

        // Re-audit immediately before unlink (TOCTOU guard).
        auditor.reaudit(item, config, confirmed, processes)?;

        if !mutate {
            return Ok(());
        }

        delete_path(&item.path, config.delete_mode).await?;

        if item.path.exists() {
            return Err(CoreError::Integrity(item.path.clone()));
        }
        Ok(())
    })
    .await;

    match attempt {
        Ok(Ok(())) => Ok(item.clone()),
        Ok(Err(err)) => Err((item.clone(), err)),
        Err(_) => Err((item.clone(), CoreError::Cancelled)),
    }
}

async fn delete_path(path: &Path, mode: DeleteMode) -> CoreResult<()> {
    let path = path.to_path_buf();
    let mode_trash = mode == DeleteMode::Trash;
    tokio::task::spawn_blocking(move || -> CoreResult<()> {
        if mode_trash {
            trash::delete(&path).map_err(|err| CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                err.to_string(),
            )))
        } else if path.is_dir() {
            std::fs::remove_dir_all(&path).map_err(CoreError::from)
        } else {
            std::fs::remove_file(&path).map_err(CoreError::from)
        }
    })
    .await
    .map_err(|join_err| CoreError::Validation(format!("delete task panicked: {join_err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn item(path: PathBuf, size: u64, safety_score: u8) -> CleanableItem {
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

    #[tokio::test]
    async fn critical_path_is_never_deleted() {
        let cleaner = Cleaner::new();
        let config = CoreConfig::default();
        let target = item(PathBuf::from("/System/foo"), 10, 100);

        let result = cleaner
            .clean(&[target], &config, false, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.deleted.is_empty());
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.freed_space, 0);
    }

    #[tokio::test]
    async fn dry_run_never_touches_the_filesystem() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.bin");
        fs::write(&path, vec![0u8; 1024]).unwrap();

        let cleaner = Cleaner::new();
        let mut config = CoreConfig::default();
        config.min_safety_score = 0;
        let target = item(path.clone(), 1024, 95);

        let result = cleaner
            .dry_run(&[target], &config, false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.deleted.len(), 1);
        assert_eq!(result.freed_space, 1024);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn clean_unlinks_a_writable_safe_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.bin");
        fs::write(&path, vec![0u8; 2048]).unwrap();

        let cleaner = Cleaner::new();
        let mut config = CoreConfig::default();
        config.min_safety_score = 0;
        config.delete_mode = DeleteMode::Unlink;
        let target = item(path.clone(), 2048, 95);

        let result = cleaner
            .clean(&[target], &config, false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.deleted.len(), 1);
        assert_eq!(result.freed_space, 2048);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn below_min_safety_score_is_silently_excluded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.bin");
        fs::write(&path, vec![0u8; 10]).unwrap();

        let cleaner = Cleaner::new();
        let mut config = CoreConfig::default();
        config.min_safety_score = 90;
        let target = item(path.clone(), 10, 50);

        let result = cleaner
            .dry_run(&[target], &config, false, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.deleted.is_empty());
        assert!(result.failed.is_empty());
        assert!(path.exists());
    }
}
