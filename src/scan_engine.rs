use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::scorer::{build_inputs, SafetyScorer};
use crate::types::{CleanableItem, ScanCategories, ScanResults};
use crate::walker::{Walker, WalkerConfig};

/// The bundled category → (roots, globs) table, loaded once at process
/// startup from `rules/categories.json`.
const RULES_JSON: &str = include_str!("../rules/categories.json");

/// Global budget for a whole `scan()` call, across every category walker and
/// the duplicate pass. Exceeding it cancels the shared token and reports
/// `Cancelled`, mirroring the Cleaner's global-timeout behavior.
const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
struct CategoryTable {
    categories: Vec<CategoryRule>,
}

#[derive(Debug, Deserialize, Clone)]
struct CategoryRule {
    name: String,
    roots: Vec<String>,
    globs: Vec<String>,
    profiles: Vec<String>,
}

fn load_rules() -> CoreResult<CategoryTable> {
    serde_json::from_str(RULES_JSON).map_err(CoreError::from)
}

/// Caller-selectable scan strictness: how aggressively a scan surfaces
/// items for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProfile {
    Default,
    Aggressive,
    Paranoid,
}

impl ScanProfile {
    fn tag(self) -> &'static str {
        match self {
            ScanProfile::Default => "default",
            ScanProfile::Aggressive => "aggressive",
            ScanProfile::Paranoid => "paranoid",
        }
    }

    /// Paranoid mode keeps only trash plus caches old enough to be
    /// confidently stale; this is the age floor applied to every other
    /// category under that profile.
    fn age_floor_days(self) -> Option<i64> {
        match self {
            ScanProfile::Paranoid => Some(180),
            _ => None,
        }
    }

    /// Minimum safety score a candidate must clear to be reported at all.
    /// Paranoid tightens this; the other profiles defer entirely to the
    /// caller-supplied `min_safety_score`.
    pub fn safety_floor(self) -> u8 {
        match self {
            ScanProfile::Paranoid => 85,
            _ => 0,
        }
    }

    pub fn includes_duplicates(self) -> bool {
        self == ScanProfile::Aggressive
    }
}

/// Orchestrates one `Walker` per category root/glob pair, scores every
/// emitted record, and aggregates the results. Never deletes; `scan()` only
/// ever reports.
pub struct ScanEngine {
    scorer: SafetyScorer,
    table: CategoryTable,
    walker_config: WalkerConfig,
}

impl ScanEngine {
    pub fn new() -> CoreResult<Self> {
        Ok(ScanEngine {
            scorer: SafetyScorer::new(),
            table: load_rules()?,
            walker_config: WalkerConfig::default(),
        })
    }

    pub fn with_scorer(scorer: SafetyScorer) -> CoreResult<Self> {
        Ok(ScanEngine {
            scorer,
            table: load_rules()?,
            walker_config: WalkerConfig::default(),
        })
    }

    /// Runs a scan over the categories a profile enables, restricted further
    /// by `categories` (the caller's explicit selection; pass
    /// `ScanCategories::all()` to defer entirely to the profile).
    pub async fn scan(
        &self,
        profile: ScanProfile,
        categories: &ScanCategories,
        token: &CancellationToken,
    ) -> CoreResult<ScanResults> {
        match timeout(DEFAULT_SCAN_TIMEOUT, self.scan_inner(profile, categories, token)).await {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                Err(CoreError::Cancelled)
            }
        }
    }

    async fn scan_inner(
        &self,
        profile: ScanProfile,
        categories: &ScanCategories,
        token: &CancellationToken,
    ) -> CoreResult<ScanResults> {
        let mut items: Vec<CleanableItem> = Vec::new();

        for rule in &self.table.categories {
            if token.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            if !rule.profiles.iter().any(|p| p == profile.tag()) {
                continue;
            }
            if !categories.contains(&rule.name) {
                continue;
            }

            let found = self.scan_category(rule, profile, token).await?;
            items.extend(found);
        }

        let duplicates = if profile.includes_duplicates() && categories.contains("duplicates") {
            crate::duplicate_detector::DuplicateDetector::new()
                .find_duplicates(&items, token)
                .await?
        } else {
            Vec::new()
        };

        Ok(ScanResults::from_items(items, duplicates))
    }

    async fn scan_category(
        &self,
        rule: &CategoryRule,
        profile: ScanProfile,
        token: &CancellationToken,
    ) -> CoreResult<Vec<CleanableItem>> {
        let roots = expand_roots(&rule.roots);
        let mut records = Vec::new();

        for root in &roots {
            for glob in &rule.globs {
                if token.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
                let walker = Walker::new(root.clone(), glob, self.walker_config.clone());
                let token = token.clone();
                let found = tokio::task::spawn_blocking(move || walker.walk(&token))
                    .await
                    .map_err(|join_err| {
                        CoreError::Validation(format!("walker task panicked: {join_err}"))
                    })?;
                records.extend(found);
            }
        }

        let age_floor = profile.age_floor_days();
        let safety_floor = profile.safety_floor();
        let mut items = Vec::with_capacity(records.len());

        for record in records {
            if let Some(floor) = age_floor {
                let age_days = (chrono::Utc::now() - record.mtime).num_days();
                if age_days < floor {
                    continue;
                }
            }

            let path_depth = record.path.components().count();
            let is_system_dir = record.path.starts_with("/System") || record.path.starts_with("/Library");
            let is_user_dir = dirs::home_dir()
                .map(|home| record.path.starts_with(home))
                .unwrap_or(false);
            let has_common_extension = record.path.extension().is_some();

            let inputs = build_inputs(
                record.size,
                record.mtime,
                path_depth,
                is_system_dir,
                is_user_dir,
                has_common_extension,
            );
            let safety_score = self
                .scorer
                .score(&record.path, &rule.name, &inputs)
                .await;

            if safety_score < safety_floor {
                continue;
            }

            let name = record
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            items.push(CleanableItem {
                id: Uuid::new_v4(),
                path: record.path,
                name,
                category: rule.name.clone(),
                size: record.size,
                mtime: record.mtime,
                atime: record.atime,
                ctime: record.ctime,
                safety_score,
                content_hash: None,
            });
        }

        Ok(items)
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new().expect("bundled category rules must parse")
    }
}

fn expand_roots(roots: &[String]) -> Vec<PathBuf> {
    roots
        .iter()
        .map(|root| {
            if let Some(rest) = root.strip_prefix("~/") {
                dirs::home_dir()
                    .map(|home| home.join(rest))
                    .unwrap_or_else(|| PathBuf::from(root))
            } else if root == "~" {
                dirs::home_dir().unwrap_or_else(|| PathBuf::from(root))
            } else {
                PathBuf::from(root)
            }
        })
        .collect()
}
