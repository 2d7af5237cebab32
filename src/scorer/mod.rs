pub mod model;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;

use crate::types::SafetyScoreInputs;
use model::{NullModel, ScoreModel};

/// Extensions contributing a modest positive safety signal (user documents).
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "doc", "pdf", "rtf", "pages"];
/// Extensions contributing a stronger positive safety signal (user media).
const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "heic", "tiff", "bmp", "mp4", "mov", "avi", "mkv", "mp3", "wav",
    "flac", "aac", "m4a",
];

/// Per-item ML call budget. A model call that exceeds this is treated as a
/// failure: the step is skipped, never escalated.
const ML_TIMEOUT: Duration = Duration::from_millis(5);

/// Produces `safety_score ∈ 0..=100` from deterministic path/name/category
/// heuristics, optionally blended with an ML hook. Given identical inputs,
/// always produces the same score — safe to evaluate concurrently across
/// threads.
pub struct SafetyScorer {
    model: Arc<dyn ScoreModel>,
}

impl SafetyScorer {
    pub fn new() -> Self {
        SafetyScorer {
            model: Arc::new(NullModel),
        }
    }

    pub fn with_model(model: Arc<dyn ScoreModel>) -> Self {
        SafetyScorer { model }
    }

    /// Synchronous deterministic core of the scoring algorithm. Split out
    /// from `score` so the ML hook's timeout wrapper lives in one place
    /// and this half stays trivially unit-testable.
    pub fn heuristic_score(&self, path: &Path, category: &str, inputs: &SafetyScoreInputs) -> u8 {
        let mut score: i32 = 50;
        let path_str = path.to_string_lossy();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name_lower = name.to_lowercase();

        // Step 2: path contribution, first match wins, non-cumulative.
        score += path_contribution(&path_str);

        // Step 3: name contribution, accumulates across matching predicates.
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        if let Some(ext) = ext.as_deref() {
            if DOCUMENT_EXTENSIONS.contains(&ext) {
                score += 8;
            }
            if MEDIA_EXTENSIONS.contains(&ext) {
                score += 10;
            }
        }
        if name_lower.contains("important") || name_lower.contains("backup") {
            score += 12;
        }
        if name_lower.starts_with("temp") || name_lower.starts_with("tmp") {
            score -= 15;
        }
        if name.contains("cache") || name.contains("Cache") {
            score -= 10;
        }
        if name_lower.ends_with(".log") || name_lower.ends_with(".tmp") {
            score -= 8;
        }

        // Step 4: category contribution.
        score += category_contribution(category);

        // Step 5: size.
        if inputs.size > 100 * 1024 * 1024 {
            score += 5;
        } else if inputs.size < 100 * 1024 {
            score -= 3;
        }

        // Step 6: age.
        if inputs.is_recent {
            score += 10;
        } else if inputs.is_old {
            score -= 10;
        }

        score.clamp(0, 100) as u8
    }

    /// Full algorithm including the optional ML hook. A model failure or
    /// timeout (budget: `ML_TIMEOUT`) is swallowed; the heuristic score
    /// stands unadjusted.
    pub async fn score(&self, path: &Path, category: &str, inputs: &SafetyScoreInputs) -> u8 {
        let base = self.heuristic_score(path, category, inputs) as i32;
        let adjustment = self.model_adjustment(*inputs).await;

        match adjustment {
            Some(delta) => (base + delta as i32).clamp(0, 100) as u8,
            None => base as u8,
        }
    }

    /// Dispatches the model call onto the blocking pool and bounds the wait
    /// to `ML_TIMEOUT`. `inputs` is `Copy`, so the call moves its own copy
    /// into the spawned task rather than borrowing across the await point.
    /// A slow model keeps running to completion on the blocking pool, but
    /// this caller stops waiting at the budget — the score genuinely never
    /// blocks past `ML_TIMEOUT`, unlike a post-hoc elapsed check on a
    /// synchronous call.
    async fn model_adjustment(&self, inputs: SafetyScoreInputs) -> Option<i16> {
        let model = Arc::clone(&self.model);
        let handle = tokio::task::spawn_blocking(move || model.score(&inputs));
        match timeout(ML_TIMEOUT, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(_join_err)) => None,
            Err(_elapsed) => None,
        }
    }

    /// Content-type classification from filename extension, with the
    /// confidence the call carries. A model-backed classifier is an
    /// external collaborator; this heuristic table is always available as
    /// the fallback.
    pub fn classify_content_type(&self, path: &Path) -> (String, f32) {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "heic" | "tiff" | "bmp" => {
                ("image".to_string(), 0.9)
            }
            "mp4" | "mov" | "avi" | "mkv" => ("video".to_string(), 0.9),
            "mp3" | "wav" | "flac" | "aac" | "m4a" => ("audio".to_string(), 0.9),
            "pdf" | "doc" | "docx" | "pages" | "rtf" | "txt" => ("document".to_string(), 0.85),
            "log" => ("log".to_string(), 0.95),
            "zip" | "tar" | "gz" | "7z" | "dmg" | "pkg" => ("archive".to_string(), 0.8),
            _ if ext.is_empty() => ("unknown".to_string(), 0.2),
            _ => ("unknown".to_string(), 0.4),
        }
    }
}

impl Default for SafetyScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn path_contribution(path_str: &str) -> i32 {
    if path_str.starts_with("/System") {
        -25
    } else if path_str.starts_with("/tmp") || path_str.starts_with("/var/tmp") {
        -20
    } else if path_str.contains("/Library/Caches/") {
        -15
    } else if contains_user_subpath(path_str, "Documents") {
        15
    } else if contains_user_subpath(path_str, "Desktop") {
        10
    } else if contains_user_subpath(path_str, "Pictures") {
        12
    } else {
        0
    }
}

fn contains_user_subpath(path_str: &str, subdir: &str) -> bool {
    path_str.contains("/Users/") && path_str.contains(&format!("/{subdir}/"))
}

fn category_contribution(category: &str) -> i32 {
    let c = category.to_lowercase();
    if c.contains("documents") || c.contains("pictures") || c.contains("music") || c.contains("videos")
    {
        15
    } else if c.contains("cache") {
        -10
    } else if c.contains("log") {
        -8
    } else if c.contains("temp") {
        -12
    } else if c.contains("system") {
        -20
    } else {
        0
    }
}

/// Derives `SafetyScoreInputs` from filesystem metadata already gathered by
/// the Walker, avoiding a second stat call.
pub fn build_inputs(
    size: u64,
    mtime: DateTime<Utc>,
    path_depth: usize,
    is_system_dir: bool,
    is_user_dir: bool,
    has_common_extension: bool,
) -> SafetyScoreInputs {
    let age_days = (Utc::now() - mtime).num_days();
    SafetyScoreInputs {
        size,
        age_days,
        path_depth,
        is_recent: age_days < 7,
        is_old: age_days > 365,
        is_system_dir,
        is_user_dir,
        has_common_extension,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn inputs(size: u64, age_days: i64) -> SafetyScoreInputs {
        SafetyScoreInputs {
            size,
            age_days,
            path_depth: 4,
            is_recent: age_days < 7,
            is_old: age_days > 365,
            is_system_dir: false,
            is_user_dir: true,
            has_common_extension: false,
        }
    }

    #[test]
    fn determinism_same_inputs_same_score() {
        let scorer = SafetyScorer::new();
        let path = PathBuf::from("/Users/alice/Library/Caches/app/data.bin");
        let i = inputs(1024, 10);
        let a = scorer.heuristic_score(&path, "userCaches", &i);
        let b = scorer.heuristic_score(&path, "userCaches", &i);
        assert_eq!(a, b);
    }

    #[test]
    fn cache_under_user_library_scores_high() {
        let scorer = SafetyScorer::new();
        let path = PathBuf::from("/Users/alice/Library/Caches/app/data.bin");
        let score = scorer.heuristic_score(&path, "userCaches", &inputs(1024, 400));
        assert!(score >= 70, "expected a safe cache score, got {score}");
    }

    #[test]
    fn documents_directory_scores_low() {
        let scorer = SafetyScorer::new();
        let path = PathBuf::from("/Users/alice/Documents/thesis.pdf");
        let score = scorer.heuristic_score(&path, "documents", &inputs(1024, 10));
        assert!(score <= 50, "expected a conservative score, got {score}");
    }

    #[test]
    fn system_path_scores_very_low() {
        let scorer = SafetyScorer::new();
        let path = PathBuf::from("/System/Library/CoreServices/thing.dat");
        let score = scorer.heuristic_score(&path, "system", &inputs(1024, 10));
        assert!(score <= 10);
    }
}
