use std::path::PathBuf;

use crate::auditor::RiskClass;

/// Stable error taxonomy shared by every component in the core.
///
/// Per-entry failures (a single unreadable file during a scan, a single
/// hashing error during dedup) are never represented here — those are
/// recovered inline and folded into the caller's result structures. This
/// enum is reserved for outcomes that change the shape of an operation's
/// result (global cancellation, a denied deletion, a provider that could
/// not be reached at all).
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("denied: {reason} ({risk:?})")]
    Denied {
        risk: RiskClass,
        reason: String,
        requires_confirmation: bool,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("post-delete verification failed for {0}")]
    Integrity(PathBuf),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("quota exceeded for provider {0}")]
    QuotaExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl CoreError {
    /// A stable machine-readable code, independent of the human message,
    /// for callers (CLI, UI) that need to branch on error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Cancelled => "cancelled",
            CoreError::Denied { .. } => "denied",
            CoreError::Io(_) => "io",
            CoreError::Integrity(_) => "integrity",
            CoreError::Encoding(_) => "encoding",
            CoreError::Crypto(_) => "crypto",
            CoreError::ProviderUnavailable(_) => "provider_unavailable",
            CoreError::QuotaExceeded(_) => "quota_exceeded",
            CoreError::NotFound(_) => "not_found",
            CoreError::Validation(_) => "validation",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
