//! Pure session transitions.
//!
//! Every mutation consumes the session and returns the next one; the engine
//! holds the only writable reference between checkpoints.

pub mod model;

use crate::decision::model::{DecisionWarning, SelectedTechnology};
use crate::error::{CoreError, CoreResult, SessionError};
use crate::gap::model::{TechCategory, TechGap};
use crate::research::model::ResearchResult;
use model::{AwaitKind, Session, TranscriptEntry, TranscriptRole, WorkflowPhase};
use std::collections::BTreeMap;

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Session {
    /// Guard used by every event-application path.
    pub fn ensure_mutable(&self) -> CoreResult<()> {
        if self.is_terminal() {
            return Err(CoreError::Terminal(self.id.clone()));
        }
        Ok(())
    }

    /// Enter a node: record the stage/phase pair and bump `updated_at`.
    pub fn enter_node(mut self, stage: &str, phase: WorkflowPhase) -> Self {
        self.stage = stage.to_string();
        self.phase = phase;
        self.updated_at = now();
        self
    }

    /// Progress is monotone within a run; lower values are ignored.
    pub fn with_progress(mut self, percentage: u8) -> Self {
        self.progress = self.progress.max(percentage.min(100));
        self.updated_at = now();
        self
    }

    pub fn with_inputs(mut self, prd_text: String, design_docs: BTreeMap<String, String>) -> Self {
        self.prd_text = prd_text;
        self.design_docs = design_docs;
        self.updated_at = now();
        self
    }

    pub fn with_completeness(
        mut self,
        score: u8,
        missing: Vec<String>,
        ambiguous: Vec<String>,
    ) -> Self {
        self.completeness_score = score.min(100);
        self.missing_elements = missing;
        self.ambiguous_elements = ambiguous;
        self.updated_at = now();
        self
    }

    pub fn with_questions(mut self, questions: Vec<String>) -> Self {
        self.clarification_questions = questions;
        self.updated_at = now();
        self
    }

    /// Apply clarification answers: append them to the transcript and the
    /// PRD context, clear the open questions, and count the round.
    pub fn apply_clarifications(mut self, answers: Vec<String>) -> Self {
        for answer in &answers {
            self.transcript.push(TranscriptEntry {
                role: TranscriptRole::User,
                text: answer.clone(),
                timestamp: now(),
            });
        }
        if !answers.is_empty() {
            self.prd_text.push_str("\n\n## Clarifications\n");
            for answer in &answers {
                self.prd_text.push_str("- ");
                self.prd_text.push_str(answer);
                self.prd_text.push('\n');
            }
        }
        self.clarification_questions.clear();
        self.clarification_rounds += 1;
        self.updated_at = now();
        self
    }

    /// Record identified gaps; pending decisions become the gap categories.
    pub fn with_gaps(mut self, gaps: Vec<TechGap>) -> Self {
        self.pending_decisions = gaps.iter().map(|g| g.category).collect();
        self.tech_gaps = gaps;
        self.updated_at = now();
        self
    }

    pub fn with_research(mut self, results: Vec<ResearchResult>) -> Self {
        self.research_results = results;
        self.updated_at = now();
        self
    }

    /// The next gap awaiting a decision, in gap order.
    pub fn next_pending(&self) -> Option<TechCategory> {
        self.pending_decisions.first().copied()
    }

    pub fn research_for(&self, category: TechCategory) -> Option<&ResearchResult> {
        self.research_results.iter().find(|r| r.category == category)
    }

    pub fn gap_for(&self, category: TechCategory) -> Option<&TechGap> {
        self.tech_gaps.iter().find(|g| g.category == category)
    }

    /// Record the user's selection for a pending gap.
    ///
    /// Every selection must be backed by a research result for the same
    /// category, and the category must still be pending.
    pub fn apply_decision(
        mut self,
        category: TechCategory,
        option_name: &str,
        rationale: Option<String>,
    ) -> CoreResult<Self> {
        self.ensure_mutable()?;
        if !self.pending_decisions.contains(&category) {
            return Err(CoreError::NoPendingDecision(category.to_string()));
        }
        if self.research_for(category).is_none() {
            return Err(CoreError::MissingResearch(category.to_string()));
        }
        self.selected_technologies
            .insert(category, SelectedTechnology::new(option_name, rationale));
        self.last_decision = Some(category);
        self = self.recompute_pending();
        self.updated_at = now();
        Ok(self)
    }

    /// Retract a selection after a `reselect` warning resolution; the
    /// category becomes pending again.
    pub fn retract_selection(mut self, category: TechCategory) -> Self {
        self.selected_technologies.remove(&category);
        if self.last_decision == Some(category) {
            self.last_decision = None;
        }
        self = self.recompute_pending();
        self.updated_at = now();
        self
    }

    /// Restore the invariant `pending = gap categories - selected keys`,
    /// preserving gap order.
    pub fn recompute_pending(mut self) -> Self {
        self.pending_decisions = self
            .tech_gaps
            .iter()
            .map(|g| g.category)
            .filter(|c| !self.selected_technologies.contains_key(c))
            .collect();
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<DecisionWarning>) -> Self {
        self.decision_warnings = warnings;
        self.updated_at = now();
        self
    }

    /// Count a conflict-resolution round for a category.
    pub fn count_conflict_round(mut self, category: TechCategory) -> Self {
        *self.conflict_rounds.entry(category).or_insert(0) += 1;
        self.updated_at = now();
        self
    }

    pub fn conflict_rounds_for(&self, category: TechCategory) -> u32 {
        self.conflict_rounds.get(&category).copied().unwrap_or(0)
    }

    /// Suspend: persist-then-wait. The engine checkpoints the returned
    /// session before any external event can resume it.
    pub fn suspend(mut self, kind: AwaitKind) -> Self {
        self.paused = true;
        self.awaiting = Some(kind);
        self.updated_at = now();
        self
    }

    pub fn resume(mut self) -> Self {
        self.paused = false;
        self.awaiting = None;
        self.updated_at = now();
        self
    }

    pub fn record_error(mut self, error: SessionError) -> Self {
        self.errors.push(error);
        self.updated_at = now();
        self
    }

    /// Append a transcript entry.
    pub fn say(mut self, role: TranscriptRole, text: impl Into<String>) -> Self {
        self.transcript.push(TranscriptEntry {
            role,
            text: text.into(),
            timestamp: now(),
        });
        self.updated_at = now();
        self
    }

    pub fn complete(mut self) -> Self {
        self.phase = WorkflowPhase::Completed;
        self.progress = 100;
        self.paused = false;
        self.awaiting = None;
        self.updated_at = now();
        self
    }

    pub fn fail(mut self, reason: &str) -> Self {
        self.phase = WorkflowPhase::Failed;
        self.stage = format!("failed: {}", reason);
        self.paused = false;
        self.awaiting = None;
        self.updated_at = now();
        self
    }

    pub fn cancel(mut self) -> Self {
        self.phase = WorkflowPhase::Cancelled;
        self.paused = false;
        self.awaiting = None;
        self.updated_at = now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::model::GapPriority;
    use crate::research::model::{LevelTag, QualityTag, TechOption};

    fn session() -> Session {
        Session::new("s-1", "p-1", "u-1", "job-1", None)
    }

    fn gap(category: TechCategory) -> TechGap {
        TechGap {
            category,
            description: String::new(),
            priority: GapPriority::High,
            impact: String::new(),
            candidate_hints: Vec::new(),
        }
    }

    fn research(category: TechCategory) -> ResearchResult {
        ResearchResult {
            category,
            options: vec![TechOption {
                name: "option-a".to_string(),
                description: String::new(),
                strengths: vec![],
                weaknesses: vec![],
                use_cases: vec![],
                popularity: 80,
                learning_curve: LevelTag::Low,
                documentation_quality: QualityTag::Good,
                integration_complexity: LevelTag::Low,
                sources: vec![],
            }],
            summary: String::new(),
            recommendation: None,
            from_catalogue: false,
        }
    }

    #[test]
    fn test_progress_is_monotone() {
        let s = session().with_progress(40).with_progress(25);
        assert_eq!(s.progress, 40);
        let s = s.with_progress(90);
        assert_eq!(s.progress, 90);
    }

    #[test]
    fn test_pending_tracks_gaps_minus_selected() {
        let s = session()
            .with_gaps(vec![gap(TechCategory::Authentication), gap(TechCategory::Database)])
            .with_research(vec![
                research(TechCategory::Authentication),
                research(TechCategory::Database),
            ]);
        assert_eq!(
            s.pending_decisions,
            vec![TechCategory::Authentication, TechCategory::Database]
        );

        let s = s
            .apply_decision(TechCategory::Authentication, "option-a", None)
            .unwrap();
        assert_eq!(s.pending_decisions, vec![TechCategory::Database]);
        assert_eq!(s.selected_technologies.len(), 1);
    }

    #[test]
    fn test_decision_requires_research() {
        let s = session().with_gaps(vec![gap(TechCategory::Email)]);
        let err = s.apply_decision(TechCategory::Email, "sendgrid", None);
        assert!(matches!(err, Err(CoreError::MissingResearch(_))));
    }

    #[test]
    fn test_decision_requires_pending_category() {
        let s = session().with_research(vec![research(TechCategory::Email)]);
        let err = s.apply_decision(TechCategory::Email, "sendgrid", None);
        assert!(matches!(err, Err(CoreError::NoPendingDecision(_))));
    }

    #[test]
    fn test_retract_restores_pending() {
        let s = session()
            .with_gaps(vec![gap(TechCategory::Storage)])
            .with_research(vec![research(TechCategory::Storage)])
            .apply_decision(TechCategory::Storage, "s3", None)
            .unwrap();
        assert!(s.pending_decisions.is_empty());
        let s = s.retract_selection(TechCategory::Storage);
        assert_eq!(s.pending_decisions, vec![TechCategory::Storage]);
        assert!(s.selected_technologies.is_empty());
    }

    #[test]
    fn test_terminal_sessions_reject_decisions() {
        let s = session()
            .with_gaps(vec![gap(TechCategory::Storage)])
            .with_research(vec![research(TechCategory::Storage)])
            .complete();
        let err = s.apply_decision(TechCategory::Storage, "s3", None);
        assert!(matches!(err, Err(CoreError::Terminal(_))));
    }

    #[test]
    fn test_clarifications_extend_prd_and_count_round() {
        let s = session()
            .with_questions(vec!["Which regions?".to_string()])
            .apply_clarifications(vec!["EU only".to_string()]);
        assert!(s.prd_text.contains("EU only"));
        assert!(s.clarification_questions.is_empty());
        assert_eq!(s.clarification_rounds, 1);
        assert_eq!(s.transcript.len(), 1);
    }

    #[test]
    fn test_suspend_and_resume() {
        let s = session().suspend(AwaitKind::Decision);
        assert!(s.paused);
        assert_eq!(s.awaiting, Some(AwaitKind::Decision));
        let s = s.resume();
        assert!(!s.paused);
        assert!(s.awaiting.is_none());
    }

    #[test]
    fn test_complete_sets_progress_100() {
        let s = session().with_progress(98).complete();
        assert_eq!(s.progress, 100);
        assert!(s.is_terminal());
    }
}
