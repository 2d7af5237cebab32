pub mod icloud;
pub mod ipfs;
pub mod local_nas;
pub mod remote_release;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreResult;

/// A backup sink: local, network, or remote. A closed tagged enum over the
/// four provider kinds, rather than open-ended dynamic dispatch over a
/// "cloud provider" interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    LocalNas,
    ICloud,
    RemoteRelease,
    Ipfs,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::LocalNas => "local_nas",
            ProviderKind::ICloud => "icloud",
            ProviderKind::RemoteRelease => "remote_release",
            ProviderKind::Ipfs => "ipfs",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: Uuid,
    pub provider: ProviderKind,
    pub location: String,
    pub size: u64,
    pub timestamp: DateTime<Utc>,
    pub is_encrypted: bool,
}

/// The capability interface every provider implements identically:
/// upload/list/delete, regardless of backing transport.
#[async_trait]
pub trait BackupProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// True if this provider is usable right now (mount present, signed in,
    /// token available, binary on PATH — whatever "available" means for
    /// this provider).
    async fn is_available(&self) -> bool;

    /// The provider's free-tier or configured capacity limit in bytes, if
    /// bounded. `None` means effectively unlimited.
    fn capacity_limit(&self) -> Option<u64>;

    async fn upload(&self, blob: &[u8]) -> CoreResult<BackupRecord>;
    async fn list(&self) -> CoreResult<Vec<BackupRecord>>;
    async fn delete(&self, id: Uuid) -> CoreResult<()>;
}
