//! Decision validation: conflict detection against prior selections and
//! recorded requirements.

pub mod model;

use crate::gap::model::TechCategory;
use model::{DecisionWarning, SelectedTechnology, WarningSeverity};
use std::collections::BTreeMap;

/// A pairwise incompatibility rule between technology families.
///
/// Both sides match case-insensitively on option-name keywords.
struct ConflictRule {
    left: &'static [&'static str],
    right: &'static [&'static str],
    severity: WarningSeverity,
    explanation: &'static str,
    remedy: &'static str,
}

/// Keyword families that conflict when selected together.
static CONFLICT_RULES: &[ConflictRule] = &[
    ConflictRule {
        left: &["lambda", "cloud functions", "cloudflare workers", "vercel functions"],
        right: &["sidekiq", "celery", "bullmq", "resque", "temporal worker"],
        severity: WarningSeverity::Critical,
        explanation: "a serverless runtime cannot host a long-running background-job framework",
        remedy: "pick a managed queue service or switch to a long-running runtime",
    },
    ConflictRule {
        left: &["sqlite"],
        right: &["socket.io", "pusher", "ably", "phoenix channels"],
        severity: WarningSeverity::Warning,
        explanation: "a single-writer embedded database pairs poorly with high-fanout realtime workloads",
        remedy: "consider a client/server database for concurrent realtime writes",
    },
    ConflictRule {
        left: &["dynamodb", "mongodb"],
        right: &["prisma", "typeorm", "hibernate"],
        severity: WarningSeverity::Info,
        explanation: "the selected ORM is primarily relational; verify first-class support for the chosen store",
        remedy: "check the ORM's driver maturity or use the vendor SDK directly",
    },
];

/// Keywords in the PRD that clash with specific option families.
static REQUIREMENT_RULES: &[(&str, &[&str], WarningSeverity, &str, &str)] = &[
    (
        "self-hosted",
        &["auth0", "firebase", "supabase", "dynamodb", "pusher"],
        WarningSeverity::Warning,
        "the PRD calls for self-hosted deployment but this option is a proprietary managed service",
        "choose an option that can run on customer infrastructure",
    ),
    (
        "offline",
        &["pusher", "ably", "firebase"],
        WarningSeverity::Info,
        "the PRD mentions offline operation; this option requires connectivity",
        "document the degraded offline behaviour or pick a local-first option",
    ),
];

fn matches_any(option: &str, keywords: &[&str]) -> bool {
    let lower = option.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Validate a new decision against prior selections and PRD requirements.
///
/// Returns every conflict found; an empty list means the decision is clean.
pub fn validate_decision(
    category: TechCategory,
    option_name: &str,
    selected: &BTreeMap<TechCategory, SelectedTechnology>,
    prd_text: &str,
) -> Vec<DecisionWarning> {
    let mut warnings = Vec::new();

    for rule in CONFLICT_RULES {
        for (prior_category, prior) in selected {
            if *prior_category == category {
                continue;
            }
            let pair_hits = (matches_any(option_name, rule.left)
                && matches_any(&prior.option_name, rule.right))
                || (matches_any(option_name, rule.right)
                    && matches_any(&prior.option_name, rule.left));
            if pair_hits {
                warnings.push(DecisionWarning {
                    category,
                    option_name: option_name.to_string(),
                    explanation: format!(
                        "{} (conflicts with earlier {} choice '{}')",
                        rule.explanation, prior_category, prior.option_name
                    ),
                    severity: rule.severity,
                    remedy: rule.remedy.to_string(),
                });
            }
        }
    }

    let prd_lower = prd_text.to_lowercase();
    for (requirement, families, severity, explanation, remedy) in REQUIREMENT_RULES {
        if prd_lower.contains(requirement) && matches_any(option_name, families) {
            warnings.push(DecisionWarning {
                category,
                option_name: option_name.to_string(),
                explanation: (*explanation).to_string(),
                severity: *severity,
                remedy: (*remedy).to_string(),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(entries: &[(TechCategory, &str)]) -> BTreeMap<TechCategory, SelectedTechnology> {
        entries
            .iter()
            .map(|(c, n)| (*c, SelectedTechnology::new(*n, None)))
            .collect()
    }

    #[test]
    fn test_serverless_vs_background_jobs_is_critical() {
        let prior = selected(&[(TechCategory::Messaging, "Sidekiq")]);
        let warnings = validate_decision(
            TechCategory::Deployment,
            "AWS Lambda",
            &prior,
            "",
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, WarningSeverity::Critical);
        assert!(warnings[0].explanation.contains("Sidekiq"));
    }

    #[test]
    fn test_rule_is_symmetric() {
        let prior = selected(&[(TechCategory::Deployment, "Vercel Functions")]);
        let warnings = validate_decision(TechCategory::Messaging, "BullMQ", &prior, "");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, WarningSeverity::Critical);
    }

    #[test]
    fn test_clean_decision_has_no_warnings() {
        let prior = selected(&[(TechCategory::Database, "PostgreSQL")]);
        let warnings = validate_decision(TechCategory::Caching, "Redis", &prior, "");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_prd_requirement_conflict() {
        let warnings = validate_decision(
            TechCategory::Authentication,
            "Auth0",
            &BTreeMap::new(),
            "The product must be self-hosted on customer hardware.",
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, WarningSeverity::Warning);
    }

    #[test]
    fn test_same_category_does_not_self_conflict() {
        let prior = selected(&[(TechCategory::Deployment, "Sidekiq")]);
        let warnings = validate_decision(TechCategory::Deployment, "AWS Lambda", &prior, "");
        assert!(warnings.is_empty());
    }
}
