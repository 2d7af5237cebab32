use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum safety score at which an item counts toward `safe_total_size`.
pub const SAFE_THRESHOLD: u8 = 70;

/// The closed category enumeration recognized on the public interface.
pub const CATEGORY_TOKENS: &[&str] = &[
    "userCaches",
    "appCaches",
    "developerJunk",
    "nodeModules",
    "xcodeJunk",
    "trash",
    "logs",
    "duplicates",
];

/// A single discovered candidate for cleaning, with measurements and a
/// safety score. Created by the Walker; mutated only by the scorer (fills
/// `safety_score`) and the duplicate detector (fills `content_hash`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanableItem {
    pub id: Uuid,
    pub path: PathBuf,
    pub name: String,
    pub category: String,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub atime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
    pub safety_score: u8,
    pub content_hash: Option<String>,
}

impl CleanableItem {
    pub fn is_safe(&self) -> bool {
        self.safety_score >= SAFE_THRESHOLD
    }
}

/// A set over the fixed category enumeration. Used to scope a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanCategories(pub Vec<String>);

impl ScanCategories {
    pub fn all() -> Self {
        ScanCategories(CATEGORY_TOKENS.iter().map(|s| s.to_string()).collect())
    }

    /// The conservative preset: caches, logs and trash only.
    pub fn safe() -> Self {
        ScanCategories(
            ["userCaches", "appCaches", "logs", "trash"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.iter().any(|c| c == category)
    }
}

/// Aggregate output of a scan. Exclusively owns its items; `DuplicateGroup`
/// holds weak references (by id) into this structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResults {
    pub items: Vec<CleanableItem>,
    pub items_by_category: HashMap<String, Vec<CleanableItem>>,
    pub total_size: u64,
    pub safe_total_size: u64,
    pub duplicates: Vec<DuplicateGroup>,
}

impl ScanResults {
    /// Builds the aggregate from a flat item list, establishing the
    /// `items_by_category` partition and the size totals in one pass.
    pub fn from_items(items: Vec<CleanableItem>, duplicates: Vec<DuplicateGroup>) -> Self {
        let mut items_by_category: HashMap<String, Vec<CleanableItem>> = HashMap::new();
        let mut total_size = 0u64;
        let mut safe_total_size = 0u64;

        for item in &items {
            total_size += item.size;
            if item.is_safe() {
                safe_total_size += item.size;
            }
            items_by_category
                .entry(item.category.clone())
                .or_default()
                .push(item.clone());
        }

        ScanResults {
            items,
            items_by_category,
            total_size,
            safe_total_size,
            duplicates,
        }
    }
}

/// A set of two or more files with byte-identical content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub items: Vec<CleanableItem>,
    pub wasted_space: u64,
    pub primary: Uuid,
}

impl DuplicateGroup {
    /// `items` must contain at least two members sharing identical size and
    /// content hash; `primary` must be the id of one of `items`.
    pub fn new(items: Vec<CleanableItem>, primary: Uuid) -> Self {
        let size = items.first().map(|i| i.size).unwrap_or(0);
        let wasted_space = size.saturating_mul(items.len().saturating_sub(1) as u64);
        DuplicateGroup {
            items,
            wasted_space,
            primary,
        }
    }
}

/// Inputs the safety scorer consumes; immutable per file at scan time.
#[derive(Debug, Clone, Copy)]
pub struct SafetyScoreInputs {
    pub size: u64,
    pub age_days: i64,
    pub path_depth: usize,
    pub is_recent: bool,
    pub is_old: bool,
    pub is_system_dir: bool,
    pub is_user_dir: bool,
    pub has_common_extension: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Derived from scanned items; lifetime bounded by the `ScanResults` it was
/// produced from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_space: u64,
    pub items: Vec<Uuid>,
    pub confidence: f32,
}

/// Result shape of a `Cleaner::clean` or `Cleaner::dry_run` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanResult {
    pub deleted: Vec<CleanableItem>,
    pub failed: Vec<FailedDeletion>,
    pub freed_space: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDeletion {
    pub item: CleanableItem,
    pub error: String,
    pub code: &'static str,
}
