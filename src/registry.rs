use std::fs;
use std::path::PathBuf;

use uuid::Uuid;

use crate::backup::providers::BackupRecord;
use crate::error::{CoreError, CoreResult};

/// Persists `BackupRecord`s to `registry/backups.json` under the per-user
/// application-data directory.
pub struct BackupRegistry {
    path: PathBuf,
}

impl BackupRegistry {
    pub fn new(path: PathBuf) -> Self {
        BackupRegistry { path }
    }

    pub fn load(&self) -> CoreResult<Vec<BackupRecord>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(CoreError::from),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(CoreError::from(err)),
        }
    }

    fn save(&self, records: &[BackupRecord]) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_vec_pretty(records)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }

    pub fn add(&self, record: BackupRecord) -> CoreResult<()> {
        let mut records = self.load()?;
        records.push(record);
        self.save(&records)
    }

    pub fn remove(&self, id: Uuid) -> CoreResult<()> {
        let mut records = self.load()?;
        records.retain(|r| r.id != id);
        self.save(&records)
    }

    /// Keeps the `keep_last_n` most recent records per provider; returns the
    /// ids removed so callers can ask providers to delete the backing blobs.
    pub fn cleanup_old_backups(&self, keep_last_n: usize) -> CoreResult<Vec<BackupRecord>> {
        let mut records = self.load()?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut kept = Vec::new();
        let mut removed = Vec::new();
        let mut counts: std::collections::HashMap<&'static str, usize> = std::collections::HashMap::new();

        for record in records {
            let count = counts.entry(record.provider.as_str()).or_insert(0);
            if *count < keep_last_n {
                *count += 1;
                kept.push(record);
            } else {
                removed.push(record);
            }
        }

        self.save(&kept)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::providers::ProviderKind;
    use chrono::{Duration as ChronoDuration, Utc};
    use tempfile::TempDir;

    fn record(provider: ProviderKind, age_days: i64) -> BackupRecord {
        BackupRecord {
            id: Uuid::new_v4(),
            provider,
            location: "x".to_string(),
            size: 10,
            timestamp: Utc::now() - ChronoDuration::days(age_days),
            is_encrypted: true,
        }
    }

    #[test]
    fn keeps_only_the_newest_n_per_provider() {
        let temp = TempDir::new().unwrap();
        let registry = BackupRegistry::new(temp.path().join("backups.json"));

        for age in [10, 5, 1, 20, 30] {
            registry.add(record(ProviderKind::LocalNas, age)).unwrap();
        }

        let removed = registry.cleanup_old_backups(2).unwrap();
        assert_eq!(removed.len(), 3);

        let remaining = registry.load().unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|r| r.location == "x"));
    }

    #[test]
    fn missing_registry_file_loads_as_empty() {
        let temp = TempDir::new().unwrap();
        let registry = BackupRegistry::new(temp.path().join("backups.json"));
        assert!(registry.load().unwrap().is_empty());
    }
}
