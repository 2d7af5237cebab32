use uuid::Uuid;

use crate::types::{CleanableItem, Priority, Recommendation, ScanResults};

/// Produces ordered recommendations from scanned items. Stateless: every
/// call is a pure function of its `ScanResults` input.
pub struct Recommender;

impl Recommender {
    pub fn new() -> Self {
        Recommender
    }

    /// Groups scored items per category, ranking by `(priority desc,
    /// estimated_space desc)`.
    pub fn recommend(&self, results: &ScanResults) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = results
            .items_by_category
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(category, items)| build_recommendation(category, items))
            .collect();

        recommendations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.estimated_space.cmp(&a.estimated_space))
        });

        recommendations
    }
}

impl Default for Recommender {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        rank(*self).cmp(&rank(*other))
    }
}

fn rank(priority: Priority) -> u8 {
    match priority {
        Priority::Low => 0,
        Priority::Medium => 1,
        Priority::High => 2,
        Priority::Critical => 3,
    }
}

/// Category → priority mapping (`cache → high, temporary → medium,
/// logs → low`), extended to the full category set with the same
/// reasoning: recoverable, regenerable data ranks higher than anything
/// touching user-authored content.
fn priority_for_category(category: &str) -> Priority {
    let c = category.to_lowercase();
    if c.contains("cache") {
        Priority::High
    } else if c.contains("temp") || c.contains("developerjunk") || c.contains("nodemodules") {
        Priority::Medium
    } else if c.contains("log") {
        Priority::Low
    } else if c.contains("duplicate") {
        Priority::High
    } else if c.contains("trash") {
        Priority::Critical
    } else {
        Priority::Low
    }
}

fn build_recommendation(category: &str, items: &[CleanableItem]) -> Recommendation {
    let estimated_space: u64 = items.iter().map(|i| i.size).sum();
    let safe_count = items.iter().filter(|i| i.is_safe()).count();
    let confidence = safe_count as f32 / items.len().max(1) as f32;

    Recommendation {
        id: Uuid::new_v4(),
        title: format!("Clean up {category}"),
        description: format!(
            "{} items totaling {} bytes in category '{category}'",
            items.len(),
            estimated_space
        ),
        priority: priority_for_category(category),
        estimated_space,
        items: items.iter().map(|i| i.id).collect(),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn item(category: &str, size: u64, safety_score: u8) -> CleanableItem {
        CleanableItem {
            id: Uuid::new_v4(),
            name: "x".to_string(),
            path: PathBuf::from(format!("/tmp/{category}/x")),
            category: category.to_string(),
            size,
            mtime: Utc::now(),
            atime: Utc::now(),
            ctime: Utc::now(),
            safety_score,
            content_hash: None,
        }
    }

    #[test]
    fn caches_rank_above_logs() {
        let results = ScanResults::from_items(
            vec![item("userCaches", 1000, 90), item("logs", 5000, 90)],
            Vec::new(),
        );
        let recs = Recommender::new().recommend(&results);
        assert_eq!(recs[0].priority, Priority::High);
        assert!(recs.iter().any(|r| r.priority == Priority::Low));
    }

    #[test]
    fn larger_estimated_space_breaks_ties_within_priority() {
        let results = ScanResults::from_items(
            vec![
                item("userCaches", 1000, 90),
                item("appCaches", 5000, 90),
            ],
            Vec::new(),
        );
        let recs = Recommender::new().recommend(&results);
        assert_eq!(recs[0].estimated_space, 5000);
    }
}
