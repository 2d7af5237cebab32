use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

use super::{BackupProvider, BackupRecord, ProviderKind};

/// Stores backup blobs on a locally-mounted volume (a NAS share or any
/// other mount point from the configured set). Unlimited capacity since
/// the local filesystem is the bound, not the provider.
pub struct LocalNasProvider {
    mount_points: Vec<PathBuf>,
}

impl LocalNasProvider {
    pub fn new(mount_points: Vec<PathBuf>) -> Self {
        LocalNasProvider { mount_points }
    }

    fn active_mount(&self) -> Option<&Path> {
        self.mount_points
            .iter()
            .find(|mount| mount.exists())
            .map(|p| p.as_path())
    }
}

#[async_trait]
impl BackupProvider for LocalNasProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalNas
    }

    async fn is_available(&self) -> bool {
        self.active_mount().is_some()
    }

    fn capacity_limit(&self) -> Option<u64> {
        None
    }

    async fn upload(&self, blob: &[u8]) -> CoreResult<BackupRecord> {
        let mount = self
            .active_mount()
            .ok_or_else(|| CoreError::ProviderUnavailable("no local NAS mount point is present".into()))?
            .to_path_buf();

        let id = Uuid::new_v4();
        let filename = format!("backup_{id}_{}.bin", Utc::now().timestamp());
        let destination = mount.join(&filename);

        tokio::fs::write(&destination, blob)
            .await
            .map_err(CoreError::from)?;

        Ok(BackupRecord {
            id,
            provider: ProviderKind::LocalNas,
            location: destination.to_string_lossy().to_string(),
            size: blob.len() as u64,
            timestamp: Utc::now(),
            is_encrypted: true,
        })
    }

    async fn list(&self) -> CoreResult<Vec<BackupRecord>> {
        Ok(Vec::new())
    }

    async fn delete(&self, _id: Uuid) -> CoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn uploads_to_first_existing_mount() {
        let missing = PathBuf::from("/this/does/not/exist/nas");
        let temp = TempDir::new().unwrap();
        let provider = LocalNasProvider::new(vec![missing, temp.path().to_path_buf()]);

        assert!(provider.is_available().await);
        let record = provider.upload(b"payload").await.unwrap();
        assert_eq!(record.size, 7);
        assert!(PathBuf::from(&record.location).exists());
    }

    #[tokio::test]
    async fn unavailable_when_no_mount_exists() {
        let provider = LocalNasProvider::new(vec![PathBuf::from("/nonexistent/nas/mount")]);
        assert!(!provider.is_available().await);
    }
}
