//! Technology research: composite ranking over option attributes.

pub mod model;

use model::{LevelTag, QualityTag, ResearchResult, TechOption};

/// Composite score used to rank options within one research result.
///
/// Popularity dominates; learning curve, documentation quality, and
/// integration complexity each contribute a fixed band; context fit is the
/// count of candidate-hint matches supplied by the caller.
pub fn composite_score(option: &TechOption, hint_matches: usize) -> f64 {
    let popularity = f64::from(option.popularity) * 0.4;
    let learning = match option.learning_curve {
        LevelTag::Low => 20.0,
        LevelTag::Medium => 12.0,
        LevelTag::High => 4.0,
    };
    let docs = match option.documentation_quality {
        QualityTag::Excellent => 15.0,
        QualityTag::Good => 11.0,
        QualityTag::Fair => 6.0,
        QualityTag::Poor => 2.0,
    };
    let integration = match option.integration_complexity {
        LevelTag::Low => 15.0,
        LevelTag::Medium => 9.0,
        LevelTag::High => 3.0,
    };
    let fit = (hint_matches as f64).min(2.0) * 5.0;
    popularity + learning + docs + integration + fit
}

/// Sort options best-first and attach a recommendation unless the top two
/// scores tie.
pub fn rank_options(result: &mut ResearchResult, hints: &[String]) {
    let hint_matches = |option: &TechOption| {
        hints
            .iter()
            .filter(|h| h.to_lowercase().contains(&option.name.to_lowercase()))
            .count()
    };
    result.options.sort_by(|a, b| {
        composite_score(b, hint_matches(b))
            .partial_cmp(&composite_score(a, hint_matches(a)))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    result.recommendation = match result.options.as_slice() {
        [] => None,
        [only] => Some(only.name.clone()),
        [first, second, ..] => {
            let a = composite_score(first, hint_matches(first));
            let b = composite_score(second, hint_matches(second));
            if (a - b).abs() < f64::EPSILON {
                None
            } else {
                Some(first.name.clone())
            }
        }
    };
}
