//! Technology gap identification support.

pub mod model;

use model::{TechCategory, TechGap};

/// Filter raw gap candidates down to the closed category set, dropping
/// duplicates while preserving first-seen order.
pub fn normalize_gaps(raw: Vec<TechGap>) -> Vec<TechGap> {
    let mut seen: Vec<TechCategory> = Vec::new();
    let mut gaps = Vec::new();
    for gap in raw {
        if seen.contains(&gap.category) {
            continue;
        }
        seen.push(gap.category);
        gaps.push(gap);
    }
    gaps
}

/// Categories already pinned by the design documents are not gaps.
pub fn without_decided(gaps: Vec<TechGap>, decided: &[TechCategory]) -> Vec<TechGap> {
    gaps.into_iter()
        .filter(|g| !decided.contains(&g.category))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::GapPriority;

    fn gap(category: TechCategory) -> TechGap {
        TechGap {
            category,
            description: format!("no {} choice recorded", category),
            priority: GapPriority::High,
            impact: "blocks the TRD technology stack section".to_string(),
            candidate_hints: Vec::new(),
        }
    }

    #[test]
    fn test_normalize_drops_duplicates() {
        let gaps = normalize_gaps(vec![
            gap(TechCategory::Database),
            gap(TechCategory::Database),
            gap(TechCategory::Storage),
        ]);
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].category, TechCategory::Database);
        assert_eq!(gaps[1].category, TechCategory::Storage);
    }

    #[test]
    fn test_without_decided_filters() {
        let gaps = without_decided(
            vec![gap(TechCategory::Database), gap(TechCategory::Email)],
            &[TechCategory::Email],
        );
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].category, TechCategory::Database);
    }
}
