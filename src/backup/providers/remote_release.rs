use async_trait::async_trait;
use chrono::Utc;
use keyring::Entry;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

use super::{BackupProvider, BackupRecord, ProviderKind};

/// 2 GiB ceiling for this provider.
const CAPACITY_LIMIT: u64 = 2 * 1024 * 1024 * 1024;

const SERVICE: &str = "disk-cleanup-core";
const ACCOUNT: &str = "remote-release-token";
const ENV_VAR: &str = "DISK_CLEANUP_REMOTE_RELEASE_TOKEN";

/// Uploads to a release-style remote endpoint (an authenticated HTTP sink)
/// over `reqwest`. The token is read from the OS keychain first, falling
/// back to the environment.
pub struct RemoteReleaseProvider {
    endpoint: String,
    client: reqwest::Client,
}

impl RemoteReleaseProvider {
    pub fn new(endpoint: String) -> Self {
        RemoteReleaseProvider {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    fn token(&self) -> Option<String> {
        if let Ok(entry) = Entry::new(SERVICE, ACCOUNT) {
            if let Ok(token) = entry.get_password() {
                return Some(token);
            }
        }
        std::env::var(ENV_VAR).ok()
    }
}

#[async_trait]
impl BackupProvider for RemoteReleaseProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RemoteRelease
    }

    async fn is_available(&self) -> bool {
        self.token().is_some()
    }

    fn capacity_limit(&self) -> Option<u64> {
        Some(CAPACITY_LIMIT)
    }

    async fn upload(&self, blob: &[u8]) -> CoreResult<BackupRecord> {
        if blob.len() as u64 > CAPACITY_LIMIT {
            return Err(CoreError::QuotaExceeded(
                ProviderKind::RemoteRelease.as_str().to_string(),
            ));
        }
        let token = self
            .token()
            .ok_or_else(|| CoreError::ProviderUnavailable("no remote-release token available".into()))?;

        let id = Uuid::new_v4();
        let filename = format!("backup_{id}_{}.bin", Utc::now().timestamp());

        let response = self
            .client
            .post(format!("{}/{}", self.endpoint.trim_end_matches('/'), filename))
            .bearer_auth(token)
            .body(blob.to_vec())
            .send()
            .await
            .map_err(|e| CoreError::ProviderUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CoreError::ProviderUnavailable(format!(
                "remote release upload failed with status {}",
                response.status()
            )));
        }

        Ok(BackupRecord {
            id,
            provider: ProviderKind::RemoteRelease,
            location: format!("{}/{}", self.endpoint, filename),
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
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn unavailable_without_a_token() {
        std::env::remove_var(ENV_VAR);
        let provider = RemoteReleaseProvider::new("https://example.invalid".to_string());
        assert!(!provider.is_available().await);
    }

    #[tokio::test]
    #[serial]
    async fn available_once_an_env_token_is_set() {
        std::env::set_var(ENV_VAR, "test-token");
        let provider = RemoteReleaseProvider::new("https://example.invalid".to_string());
        assert!(provider.is_available().await);
        std::env::remove_var(ENV_VAR);
    }
}
