use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

use super::{BackupProvider, BackupRecord, ProviderKind};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Unlimited fallback provider: shells out to a local `ipfs` binary.
pub struct IpfsProvider {
    binary: String,
}

impl IpfsProvider {
    pub fn new() -> Self {
        IpfsProvider {
            binary: "ipfs".to_string(),
        }
    }

    async fn binary_present(&self) -> bool {
        timeout(COMMAND_TIMEOUT, Command::new(&self.binary).arg("id").output())
            .await
            .ok()
            .and_then(|res| res.ok())
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

impl Default for IpfsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackupProvider for IpfsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ipfs
    }

    async fn is_available(&self) -> bool {
        self.binary_present().await
    }

    fn capacity_limit(&self) -> Option<u64> {
        None
    }

    async fn upload(&self, blob: &[u8]) -> CoreResult<BackupRecord> {
        let mut child = Command::new(&self.binary)
            .arg("add")
            .arg("-Q")
            .arg("--stdin-name")
            .arg(format!("backup_{}.bin", Uuid::new_v4()))
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| CoreError::ProviderUnavailable(format!("failed to spawn ipfs: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(blob)
                .await
                .map_err(|e| CoreError::ProviderUnavailable(e.to_string()))?;
        }

        let output = timeout(COMMAND_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| CoreError::ProviderUnavailable("ipfs add timed out".into()))?
            .map_err(|e| CoreError::ProviderUnavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(CoreError::ProviderUnavailable("ipfs add failed".into()));
        }

        let cid = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if cid.is_empty() {
            return Err(CoreError::ProviderUnavailable("ipfs returned no CID".into()));
        }

        Ok(BackupRecord {
            id: Uuid::new_v4(),
            provider: ProviderKind::Ipfs,
            location: format!("ipfs://{cid}"),
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

    #[tokio::test]
    async fn reports_unavailable_when_binary_is_missing() {
        let provider = IpfsProvider {
            binary: "definitely-not-a-real-binary-xyz".to_string(),
        };
        assert!(!provider.is_available().await);
    }
}
