//! Composite TRD validation: structural checks plus six weighted reviewers.

pub mod reviewers;
pub mod structural;

use crate::error::DocgenResult;
use std::sync::Arc;
use structural::{StructuralOptions, StructuralOutcome};
use tra_core::artifact::model::{ReportGap, ReviewerKind, ReviewerScore, ValidationReport};
use tra_core::artifact::{overall_score, reviewer_aggregate};
use tra_core::config::LlmConfig;
use tra_core::decision::model::WarningSeverity;
use tra_gateway::LlmGateway;
use tracing::{debug, info};

/// Validator thresholds.
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// Overall score required to pass.
    pub pass_threshold: u8,
    /// Structural score below which reviewers are skipped entirely.
    pub fast_fail_structural: u8,
    /// Regenerate budget; the final failing iteration is force-passed.
    pub max_iterations: u32,
    pub structural: StructuralOptions,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            pass_threshold: 90,
            fast_fail_structural: 6,
            max_iterations: 3,
            structural: StructuralOptions::default(),
        }
    }
}

/// Assembles programmatic and reviewer checks into a composite score.
pub struct Validator {
    llm: Arc<dyn LlmGateway>,
    llm_config: LlmConfig,
    options: ValidatorOptions,
}

fn mean(scores: &[ReviewerScore], kinds: &[ReviewerKind]) -> u8 {
    let picked: Vec<u8> = scores
        .iter()
        .filter(|s| kinds.contains(&s.reviewer))
        .map(|s| s.score)
        .collect();
    if picked.is_empty() {
        return 0;
    }
    (picked.iter().map(|s| u32::from(*s)).sum::<u32>() / picked.len() as u32) as u8
}

impl Validator {
    pub fn new(llm: Arc<dyn LlmGateway>, llm_config: LlmConfig, options: ValidatorOptions) -> Self {
        Self {
            llm,
            llm_config,
            options,
        }
    }

    /// Validate one TRD iteration (1-based).
    ///
    /// A structural score under the fast-fail floor skips the reviewer calls.
    /// A failing report at the final iteration comes back with
    /// `forced_pass = true` so the workflow can proceed under human review.
    pub async fn validate_trd(&self, trd: &str, iteration: u32) -> DocgenResult<ValidationReport> {
        let StructuralOutcome { points, findings } =
            structural::evaluate(trd, &self.options.structural);

        let mut report = if points < self.options.fast_fail_structural {
            debug!(structural = points, "structural fast-fail; skipping reviewers");
            ValidationReport::structural_failure(
                points,
                iteration,
                format!("structural score {} below fast-fail floor", points),
            )
        } else {
            let scores = reviewers::run_reviewers(&self.llm, &self.llm_config, trd).await?;
            let aggregate = reviewer_aggregate(&scores);
            let overall = overall_score(points, &scores);

            let mut gaps: Vec<ReportGap> = findings
                .iter()
                .map(|finding| ReportGap {
                    severity: WarningSeverity::Warning,
                    detail: finding.clone(),
                })
                .collect();
            gaps.extend(scores.iter().filter(|s| s.score < 70).map(|s| ReportGap {
                severity: WarningSeverity::Warning,
                detail: format!("{} reviewer scored {}", s.reviewer.as_str(), s.score),
            }));

            let recommendations: Vec<String> = scores
                .iter()
                .flat_map(|s| s.notes.iter().cloned())
                .take(10)
                .collect();

            ValidationReport {
                overall,
                structure: points,
                clarity: mean(&scores, &[ReviewerKind::Clarity]),
                actionability: mean(&scores, &[ReviewerKind::Api, ReviewerKind::Database]),
                consistency: mean(&scores, &[ReviewerKind::Architecture, ReviewerKind::Security]),
                reviewer_aggregate: aggregate,
                reviewers: scores,
                gaps,
                recommendations,
                iteration,
                passed: overall >= self.options.pass_threshold,
                forced_pass: false,
            }
        };

        report.iteration = iteration;
        if !report.passed && iteration >= self.options.max_iterations {
            report.forced_pass = true;
        }

        info!(
            iteration,
            overall = report.overall,
            structure = report.structure,
            passed = report.passed,
            forced_pass = report.forced_pass,
            "TRD validated"
        );
        Ok(report)
    }
}
