use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

use super::{BackupProvider, BackupRecord, ProviderKind};

/// 5 GiB free-tier ceiling for this provider.
const FREE_TIER_LIMIT: u64 = 5 * 1024 * 1024 * 1024;

/// Uploads into the user's iCloud Drive container. Sign-in state is probed
/// by shelling out to `brctl status` via `tokio::process::Command`.
pub struct ICloudProvider {
    drive_root: PathBuf,
}

impl ICloudProvider {
    pub fn new(drive_root: PathBuf) -> Self {
        ICloudProvider { drive_root }
    }

    async fn signed_in(&self) -> bool {
        if !self.drive_root.exists() {
            return false;
        }
        match Command::new("brctl").arg("status").output().await {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                !stdout.contains("not signed in")
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
impl BackupProvider for ICloudProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ICloud
    }

    async fn is_available(&self) -> bool {
        self.signed_in().await
    }

    fn capacity_limit(&self) -> Option<u64> {
        Some(FREE_TIER_LIMIT)
    }

    async fn upload(&self, blob: &[u8]) -> CoreResult<BackupRecord> {
        if blob.len() as u64 > FREE_TIER_LIMIT {
            return Err(CoreError::QuotaExceeded(ProviderKind::ICloud.as_str().to_string()));
        }
        if !self.is_available().await {
            return Err(CoreError::ProviderUnavailable(
                "iCloud Drive is not signed in or not present".into(),
            ));
        }

        let id = Uuid::new_v4();
        let filename = format!("backup_{id}_{}.bin", Utc::now().timestamp());
        let destination = self.drive_root.join(&filename);
        tokio::fs::write(&destination, blob)
            .await
            .map_err(CoreError::from)?;

        Ok(BackupRecord {
            id,
            provider: ProviderKind::ICloud,
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
