//! Safe disk-cleanup engine core: bounded-parallel scanning, a deterministic
//! safety scorer and security auditor, content-addressed duplicate
//! detection, and a guarded, cancellable deletion pipeline with optional
//! encrypted backup.
//!
//! The command-line front end, desktop UI, localization, update checking,
//! notification display, and OS-scheduler registration are external
//! collaborators and live outside this crate.

pub mod auditor;
pub mod backup;
pub mod cleaner;
pub mod config;
pub mod duplicate_detector;
pub mod error;
pub mod path_policy;
pub mod process_snapshot;
pub mod recommender;
pub mod registry;
pub mod scan_engine;
pub mod scorer;
pub mod types;
pub mod walker;

pub use auditor::{AuditVerdict, RiskClass, SecurityAuditor};
pub use backup::providers::{BackupProvider, BackupRecord, ProviderKind};
pub use backup::snapshot::{BackupDelta, BackupFileChange, ChangeType, DiskSnapshot};
pub use backup::BackupCoordinator;
pub use cleaner::Cleaner;
pub use config::{ConfigStore, CoreConfig, DeleteMode};
pub use duplicate_detector::DuplicateDetector;
pub use error::{CoreError, CoreResult};
pub use path_policy::PathPolicy;
pub use process_snapshot::ProcessSnapshot;
pub use recommender::Recommender;
pub use registry::BackupRegistry;
pub use scan_engine::{ScanEngine, ScanProfile};
pub use scorer::SafetyScorer;
pub use types::{
    CleanResult, CleanableItem, DuplicateGroup, FailedDeletion, Priority, Recommendation,
    SafetyScoreInputs, ScanCategories, ScanResults, CATEGORY_TOKENS, SAFE_THRESHOLD,
};
