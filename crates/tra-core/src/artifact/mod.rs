//! Output artifacts and validation scoring.

pub mod model;

use model::{ReviewerScore, ValidationReport};

/// Maximum points awarded by the structural pass.
pub const STRUCTURAL_MAX: u8 = 15;

/// Weighted reviewer aggregate, 0-100.
pub fn reviewer_aggregate(reviewers: &[ReviewerScore]) -> u8 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for r in reviewers {
        total += f64::from(r.score) * r.reviewer.weight();
        weight_sum += r.reviewer.weight();
    }
    if weight_sum == 0.0 {
        return 0;
    }
    (total / weight_sum).round() as u8
}

/// Composite overall score: structural points plus the reviewer aggregate
/// scaled into the remaining 85-point band.
pub fn overall_score(structure: u8, reviewers: &[ReviewerScore]) -> u8 {
    let aggregate = f64::from(reviewer_aggregate(reviewers));
    let scaled = aggregate * f64::from(100 - STRUCTURAL_MAX) / 100.0;
    (f64::from(structure.min(STRUCTURAL_MAX)) + scaled).round().min(100.0) as u8
}

impl ValidationReport {
    /// An all-zero failing report used when the structural fast-fail path
    /// skips the specialist reviewers.
    pub fn structural_failure(structure: u8, iteration: u32, detail: String) -> Self {
        Self {
            overall: overall_score(structure, &[]),
            structure,
            clarity: 0,
            actionability: 0,
            consistency: 0,
            reviewer_aggregate: 0,
            reviewers: Vec::new(),
            gaps: vec![model::ReportGap {
                severity: crate::decision::model::WarningSeverity::Critical,
                detail,
            }],
            recommendations: vec!["regenerate the document".to_string()],
            iteration,
            passed: false,
            forced_pass: false,
        }
    }
}
