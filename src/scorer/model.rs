use crate::types::SafetyScoreInputs;

/// Seam for the optional ML-assisted scoring hook. The core ships only the
/// heuristic baseline; a model implementation is an external collaborator
/// that can plug in by implementing this trait.
///
/// `score` returns `round((p - 0.5) * 20)` where `p` is the model's own
/// confidence the file is safe to delete, bounded to a ±10 swing on the
/// heuristic score. Returning `None` means "skip this item" — treated the
/// same as a timeout or failure.
pub trait ScoreModel: Send + Sync {
    fn score(&self, inputs: &SafetyScoreInputs) -> Option<i16>;
}

/// Placeholder model that never adjusts the heuristic score. Kept so
/// `SafetyScorer` always has a concrete `Arc<dyn ScoreModel>` slot to
/// populate without special-casing "no model loaded" at every call site.
pub struct NullModel;

impl ScoreModel for NullModel {
    fn score(&self, _inputs: &SafetyScoreInputs) -> Option<i16> {
        None
    }
}
