use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point-in-time manifest of the disk state under consideration. Keyed by
/// path for stable, sorted serialization into canonical JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSnapshot {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub total_size: u64,
    pub file_count: usize,
    pub metadata: BTreeMap<String, String>,
    pub manifest: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub size: u64,
    pub content_hash: String,
    pub mtime: DateTime<Utc>,
}

impl DiskSnapshot {
    pub fn new(manifest: BTreeMap<String, ManifestEntry>) -> Self {
        let total_size = manifest.values().map(|e| e.size).sum();
        let file_count = manifest.len();
        DiskSnapshot {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            total_size,
            file_count,
            metadata: BTreeMap::new(),
            manifest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFileChange {
    pub path: String,
    pub change_type: ChangeType,
    pub size_delta: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDelta {
    pub changes: Vec<BackupFileChange>,
    pub total_size_delta: i64,
    pub previous_snapshot_id: Uuid,
    pub current_snapshot_id: Uuid,
}

/// Computes the delta between two manifests keyed by path. Added:
/// current-only. Deleted: previous-only. Modified: hash or mtime differ.
pub fn compute_delta(previous: &DiskSnapshot, current: &DiskSnapshot) -> BackupDelta {
    let now = current.timestamp;
    let mut changes = Vec::new();
    let mut total_size_delta: i64 = 0;

    for (path, entry) in &current.manifest {
        match previous.manifest.get(path) {
            None => {
                changes.push(BackupFileChange {
                    path: path.clone(),
                    change_type: ChangeType::Added,
                    size_delta: entry.size as i64,
                    timestamp: now,
                });
                total_size_delta += entry.size as i64;
            }
            Some(prev_entry) => {
                if prev_entry.content_hash != entry.content_hash || prev_entry.mtime != entry.mtime
                {
                    let size_delta = entry.size as i64 - prev_entry.size as i64;
                    changes.push(BackupFileChange {
                        path: path.clone(),
                        change_type: ChangeType::Modified,
                        size_delta,
                        timestamp: now,
                    });
                    total_size_delta += size_delta;
                }
            }
        }
    }

    for (path, entry) in &previous.manifest {
        if !current.manifest.contains_key(path) {
            let size_delta = -(entry.size as i64);
            changes.push(BackupFileChange {
                path: path.clone(),
                change_type: ChangeType::Deleted,
                size_delta,
                timestamp: now,
            });
            total_size_delta += size_delta;
        }
    }

    BackupDelta {
        changes,
        total_size_delta,
        previous_snapshot_id: previous.id,
        current_snapshot_id: current.id,
    }
}

/// Reconstructs a manifest-level view of `base + delta`, used to verify
/// delta soundness: `file_count == base.file_count + |added| - |deleted|`.
pub fn apply_delta(base: &DiskSnapshot, delta: &BackupDelta) -> (usize, u64) {
    let added = delta
        .changes
        .iter()
        .filter(|c| c.change_type == ChangeType::Added)
        .count();
    let deleted = delta
        .changes
        .iter()
        .filter(|c| c.change_type == ChangeType::Deleted)
        .count();
    let file_count = base.file_count + added - deleted;
    let total_size = (base.total_size as i64 + delta.total_size_delta).max(0) as u64;
    (file_count, total_size)
}
