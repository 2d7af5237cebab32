use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::path_policy::PathPolicy;
use crate::process_snapshot::ProcessSnapshot;
use crate::types::CleanableItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskClass {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct AuditVerdict {
    pub allowed: bool,
    pub risk_score: u8,
    pub risk: RiskClass,
    pub reason: String,
    pub requires_confirmation: bool,
}

/// Gates every candidate deletion. Any error encountered while auditing
/// resolves to deny, never to allow.
pub struct SecurityAuditor {
    policy: PathPolicy,
}

impl SecurityAuditor {
    pub fn new() -> Self {
        SecurityAuditor {
            policy: PathPolicy::new(),
        }
    }

    /// Runs the full decision procedure against one item.
    ///
    /// `confirmed` stands in for "the caller has explicitly confirmed"
    /// (rule 2); `processes` is a snapshot of currently-running processes
    /// used for the open-handle check (rule 4).
    pub fn audit(
        &self,
        item: &CleanableItem,
        config: &CoreConfig,
        confirmed: bool,
        processes: &ProcessSnapshot,
    ) -> AuditVerdict {
        let path = &item.path;

        // Rule 1: critical path.
        if self.policy.is_critical(path) {
            return deny(RiskClass::Critical, "path is under a critical system root", false);
        }

        // Rule 2: sensitive pattern without explicit confirmation.
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.policy.is_sensitive(name) && !confirmed {
                return deny(
                    RiskClass::High,
                    "filename matches a sensitive pattern and was not confirmed",
                    true,
                );
            }
        }

        // Rule 3: symlink whose target is critical.
        if let Ok(metadata) = std::fs::symlink_metadata(path) {
            if metadata.file_type().is_symlink() {
                if let Ok(target) = std::fs::read_link(path) {
                    let resolved = if target.is_absolute() {
                        target
                    } else {
                        path.parent()
                            .map(|parent| parent.join(&target))
                            .unwrap_or(target)
                    };
                    if self.policy.is_critical(&resolved) {
                        return deny(RiskClass::Critical, "symlink target is critical", false);
                    }
                }
            }
        } else {
            // Unreadable path metadata: fail closed.
            return deny(RiskClass::High, "unable to stat path for audit", false);
        }

        // Rule 4: live process holds the path open.
        if processes.command_contains_path(&path.to_string_lossy()) {
            return deny(RiskClass::High, "path appears to be in use by a running process", false);
        }

        // Rule 5: not writable by the process.
        if !is_writable(path) {
            return deny(RiskClass::High, "path is not writable by this process", false);
        }

        // Rule 6: risk score.
        let risk_score = self.risk_score(item);
        if risk_score >= 70 {
            let aggressive_override =
                config.aggressive_mode && item.safety_score >= 80;
            if !aggressive_override {
                return deny(
                    RiskClass::Medium,
                    "computed risk score meets or exceeds the deny threshold",
                    false,
                );
            }
        }

        AuditVerdict {
            allowed: true,
            risk_score,
            risk: RiskClass::Low,
            reason: "passed all audit rules".to_string(),
            requires_confirmation: false,
        }
    }

    /// Re-audits immediately before unlink, mitigating TOCTOU races between
    /// the initial audit and the actual deletion attempt.
    pub fn reaudit(
        &self,
        item: &CleanableItem,
        config: &CoreConfig,
        confirmed: bool,
        processes: &ProcessSnapshot,
    ) -> Result<(), CoreError> {
        let verdict = self.audit(item, config, confirmed, processes);
        if verdict.allowed {
            Ok(())
        } else {
            Err(CoreError::Denied {
                risk: verdict.risk,
                reason: verdict.reason,
                requires_confirmation: verdict.requires_confirmation,
            })
        }
    }

    fn risk_score(&self, item: &CleanableItem) -> u8 {
        let path_str = item.path.to_string_lossy();
        let mut score: i32 = 0;

        if let Some(home) = dirs::home_dir() {
            if item.path.starts_with(&home) {
                score += 10;
            }
        }
        if path_str.starts_with("/Library") || path_str.starts_with("/System") {
            score += 50;
        }

        let age_days = (chrono::Utc::now() - item.mtime).num_days();
        if age_days < 7 {
            score += 30;
        } else if age_days < 30 {
            score += 20;
        }

        if item.size > 1024 * 1024 * 1024 {
            score += 25;
        } else if item.size > 100 * 1024 * 1024 {
            score += 15;
        }

        score.clamp(0, 100) as u8
    }
}

impl Default for SecurityAuditor {
    fn default() -> Self {
        Self::new()
    }
}

fn deny(risk: RiskClass, reason: &str, requires_confirmation: bool) -> AuditVerdict {
    AuditVerdict {
        allowed: false,
        risk_score: 100,
        risk,
        reason: reason.to_string(),
        requires_confirmation,
    }
}

#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(metadata) => metadata.permissions().mode() & 0o200 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use std::fs;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn item_at(path: std::path::PathBuf, size: u64) -> CleanableItem {
        CleanableItem {
            id: Uuid::new_v4(),
            name: path.file_name().unwrap().to_string_lossy().to_string(),
            path,
            category: "userCaches".to_string(),
            size,
            mtime: chrono::Utc::now(),
            atime: chrono::Utc::now(),
            ctime: chrono::Utc::now(),
            safety_score: 90,
            content_hash: None,
        }
    }

    #[test]
    fn critical_path_is_always_denied() {
        let auditor = SecurityAuditor::new();
        let processes = ProcessSnapshot::empty();
        let config = CoreConfig::default();
        let item = item_at(std::path::PathBuf::from("/System/Library/foo"), 10);
        let verdict = auditor.audit(&item, &config, false, &processes);
        assert!(!verdict.allowed);
        assert_eq!(verdict.risk, RiskClass::Critical);
    }

    #[test]
    fn sensitive_file_without_confirmation_is_denied() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("id_rsa");
        fs::write(&path, b"secret").unwrap();

        let auditor = SecurityAuditor::new();
        let processes = ProcessSnapshot::empty();
        let config = CoreConfig::default();
        let item = item_at(path, 10);

        let verdict = auditor.audit(&item, &config, false, &processes);
        assert!(!verdict.allowed);
        assert!(verdict.requires_confirmation);
    }

    #[test]
    fn writable_cache_file_is_allowed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.bin");
        fs::write(&path, b"data").unwrap();

        let auditor = SecurityAuditor::new();
        let processes = ProcessSnapshot::empty();
        let config = CoreConfig::default();
        let item = item_at(path, 10);

        let verdict = auditor.audit(&item, &config, false, &processes);
        assert!(verdict.allowed);
    }
}
