pub mod compression;
pub mod crypto;
pub mod providers;
pub mod snapshot;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};
use crate::registry::BackupRegistry;
use crate::types::CleanableItem;

use crypto::BackupCipher;
use providers::{BackupProvider, BackupRecord, ProviderKind};
use snapshot::{DiskSnapshot, ManifestEntry};

/// Captures, encrypts, compresses, and ships a snapshot through whichever
/// provider is available, trying providers in priority order and
/// surfacing the last error if all fail.
pub struct BackupCoordinator {
    cipher: BackupCipher,
    providers: Vec<Box<dyn BackupProvider>>,
    registry: BackupRegistry,
}

impl BackupCoordinator {
    pub fn new(providers: Vec<Box<dyn BackupProvider>>, registry_path: PathBuf) -> CoreResult<Self> {
        Ok(BackupCoordinator {
            cipher: BackupCipher::load_or_create()?,
            providers,
            registry: BackupRegistry::new(registry_path),
        })
    }

    /// Builds a manifest-keyed snapshot from a set of items, typically the
    /// set about to be deleted or the full scan result set.
    pub fn snapshot_of(items: &[CleanableItem]) -> DiskSnapshot {
        let mut manifest = BTreeMap::new();
        for item in items {
            manifest.insert(
                item.path.to_string_lossy().to_string(),
                ManifestEntry {
                    size: item.size,
                    content_hash: item.content_hash.clone().unwrap_or_default(),
                    mtime: item.mtime,
                },
            );
        }
        DiskSnapshot::new(manifest)
    }

    /// Serializes, compresses, and encrypts a snapshot, then uploads it
    /// through the first provider that reports itself available, in
    /// priority order: LocalNas, ICloud, RemoteRelease, Ipfs.
    pub async fn backup(&self, snapshot: &DiskSnapshot) -> CoreResult<BackupRecord> {
        let serialized = serde_json::to_vec(snapshot).map_err(CoreError::from)?;
        let compressed = compression::compress(&serialized)?;
        let encrypted = self.cipher.encrypt(&compressed.bytes)?;

        let mut last_error: Option<CoreError> = None;
        for provider in &self.providers {
            if !provider.is_available().await {
                continue;
            }
            if let Some(limit) = provider.capacity_limit() {
                if encrypted.len() as u64 > limit {
                    last_error = Some(CoreError::QuotaExceeded(provider.kind().as_str().to_string()));
                    continue;
                }
            }
            match provider.upload(&encrypted).await {
                Ok(record) => {
                    self.registry.add(record.clone())?;
                    return Ok(record);
                }
                Err(err) => last_error = Some(err),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            CoreError::ProviderUnavailable("no backup provider is available".into())
        }))
    }

    /// Reverses the pipeline: decrypt, decompress, deserialize. Used by
    /// restore flows and exercised by the round-trip property test.
    pub fn restore_payload(&self, encrypted: &[u8]) -> CoreResult<DiskSnapshot> {
        let compressed = self.cipher.decrypt(encrypted)?;
        let serialized = compression::decompress(&compressed)?;
        serde_json::from_slice(&serialized).map_err(CoreError::from)
    }

    pub fn cleanup_old_backups(&self, keep_last_n: usize) -> CoreResult<Vec<BackupRecord>> {
        self.registry.cleanup_old_backups(keep_last_n)
    }

    pub fn list_records(&self) -> CoreResult<Vec<BackupRecord>> {
        self.registry.load()
    }
}

/// Fixes the priority order providers are tried in. Callers assemble the
/// provider list themselves (mount points, drive roots, and endpoints are
/// environment-specific); this just fixes the order.
pub fn default_provider_order(
    local_nas_mounts: Vec<PathBuf>,
    icloud_drive_root: PathBuf,
    remote_release_endpoint: String,
) -> Vec<Box<dyn BackupProvider>> {
    vec![
        Box::new(providers::local_nas::LocalNasProvider::new(local_nas_mounts)),
        Box::new(providers::icloud::ICloudProvider::new(icloud_drive_root)),
        Box::new(providers::remote_release::RemoteReleaseProvider::new(
            remote_release_endpoint,
        )),
        Box::new(providers::ipfs::IpfsProvider::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;
    use uuid::Uuid;

    struct AlwaysAvailable {
        uploaded: AtomicBool,
    }

    #[async_trait]
    impl BackupProvider for AlwaysAvailable {
        fn kind(&self) -> ProviderKind {
            ProviderKind::LocalNas
        }
        async fn is_available(&self) -> bool {
            true
        }
        fn capacity_limit(&self) -> Option<u64> {
            None
        }
        async fn upload(&self, blob: &[u8]) -> CoreResult<BackupRecord> {
            self.uploaded.store(true, Ordering::SeqCst);
            Ok(BackupRecord {
                id: Uuid::new_v4(),
                provider: ProviderKind::LocalNas,
                location: "memory://fixture".to_string(),
                size: blob.len() as u64,
                timestamp: chrono::Utc::now(),
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

    #[tokio::test]
    async fn snapshot_round_trips_through_compress_and_encrypt() {
        let temp = TempDir::new().unwrap();
        let coordinator = BackupCoordinator::new(
            vec![Box::new(AlwaysAvailable {
                uploaded: AtomicBool::new(false),
            })],
            temp.path().join("backups.json"),
        )
        .unwrap();

        let items = vec![CleanableItem {
            id: Uuid::new_v4(),
            path: "/tmp/a.bin".into(),
            name: "a.bin".to_string(),
            category: "userCaches".to_string(),
            size: 1024,
            mtime: chrono::Utc::now(),
            atime: chrono::Utc::now(),
            ctime: chrono::Utc::now(),
            safety_score: 90,
            content_hash: Some("deadbeef".to_string()),
        }];
        let snapshot = BackupCoordinator::snapshot_of(&items);

        let record = coordinator.backup(&snapshot).await.unwrap();
        assert_eq!(record.provider, ProviderKind::LocalNas);

        let serialized = serde_json::to_vec(&snapshot).unwrap();
        let compressed = compression::compress(&serialized).unwrap();
        let encrypted = coordinator.cipher.encrypt(&compressed.bytes).unwrap();
        let restored = coordinator.restore_payload(&encrypted).unwrap();
        assert_eq!(restored.file_count, snapshot.file_count);
        assert_eq!(restored.total_size, snapshot.total_size);
    }
}
