//! Structural validation pass: cheap deterministic checks that run before
//! any reviewer LLM call.

use crate::generators::TRD_SECTIONS;
use crate::util::split_sections;
use regex::Regex;
use std::sync::OnceLock;

/// Thresholds for the structural checks.
#[derive(Debug, Clone)]
pub struct StructuralOptions {
    /// Minimum body length per section, in characters.
    pub min_section_chars: usize,
    /// Minimum endpoint count under API Specification.
    pub min_endpoints: usize,
}

impl Default for StructuralOptions {
    fn default() -> Self {
        Self {
            min_section_chars: 120,
            min_endpoints: 3,
        }
    }
}

/// Result of the structural pass: points out of 15 plus findings.
#[derive(Debug, Clone)]
pub struct StructuralOutcome {
    pub points: u8,
    pub findings: Vec<String>,
}

fn endpoint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(GET|POST|PUT|PATCH|DELETE)\s+/\S*").unwrap())
}

/// Evaluate the TRD's structure.
///
/// Point split (max 15): section presence and order 6, section lengths 3,
/// endpoint count 3, required code blocks 3.
pub fn evaluate(trd: &str, options: &StructuralOptions) -> StructuralOutcome {
    let sections = split_sections(trd);
    let mut findings = Vec::new();

    // Presence and order (6 points).
    let found: Vec<usize> = TRD_SECTIONS
        .iter()
        .filter_map(|required| sections.iter().position(|(heading, _)| heading == required))
        .collect();
    let present = found.len();
    for required in TRD_SECTIONS {
        if !sections.iter().any(|(heading, _)| heading == required) {
            findings.push(format!("missing required section '{}'", required));
        }
    }
    let in_order = found.windows(2).all(|pair| pair[0] < pair[1]);
    if !in_order {
        findings.push("required sections are out of order".to_string());
    }
    let mut presence_points = (present * 6 / TRD_SECTIONS.len()) as u8;
    if !in_order {
        presence_points = presence_points.saturating_sub(1);
    }

    // Section lengths (3 points).
    let measured: Vec<&(String, String)> = sections
        .iter()
        .filter(|(heading, _)| TRD_SECTIONS.contains(&heading.as_str()))
        .collect();
    let long_enough = measured
        .iter()
        .filter(|(_, body)| body.len() >= options.min_section_chars)
        .count();
    for (heading, body) in &measured {
        if body.len() < options.min_section_chars {
            findings.push(format!(
                "section '{}' is too thin ({} chars, minimum {})",
                heading,
                body.len(),
                options.min_section_chars
            ));
        }
    }
    let length_points = if measured.is_empty() {
        0
    } else {
        (long_enough * 3 / measured.len()) as u8
    };

    // Endpoint count under API Specification (3 points).
    let api_body = sections
        .iter()
        .find(|(heading, _)| heading == "API Specification")
        .map(|(_, body)| body.as_str())
        .unwrap_or_default();
    let endpoint_count = endpoint_re().find_iter(api_body).count();
    if endpoint_count < options.min_endpoints {
        findings.push(format!(
            "API Specification lists {} endpoints, minimum {}",
            endpoint_count, options.min_endpoints
        ));
    }
    let endpoint_points = ((endpoint_count.min(options.min_endpoints) * 3)
        / options.min_endpoints.max(1)) as u8;

    // Required code blocks (3 points).
    let db_body = sections
        .iter()
        .find(|(heading, _)| heading == "Database Schema")
        .map(|(_, body)| body.as_str())
        .unwrap_or_default();
    let mut code_points = 0u8;
    if api_body.contains("```") {
        code_points += 2;
    } else {
        findings.push("API Specification has no code blocks".to_string());
    }
    if db_body.contains("```") {
        code_points += 1;
    } else {
        findings.push("Database Schema has no code block".to_string());
    }

    StructuralOutcome {
        points: (presence_points + length_points + endpoint_points + code_points).min(15),
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_trd() -> String {
        let filler = "x".repeat(150);
        let mut doc = String::from("# TRD\n");
        for section in TRD_SECTIONS {
            doc.push_str(&format!("## {}\n", section));
            match *section {
                "API Specification" => {
                    doc.push_str("GET /api/users\nPOST /api/users\nDELETE /api/users/{id}\n");
                    doc.push_str("```json\n{\"example\": true}\n```\n");
                    doc.push_str(&filler);
                }
                "Database Schema" => {
                    doc.push_str("```sql\nCREATE TABLE users (id TEXT);\n```\n");
                    doc.push_str(&filler);
                }
                _ => doc.push_str(&filler),
            }
            doc.push('\n');
        }
        doc
    }

    #[test]
    fn test_complete_trd_scores_full_points() {
        let outcome = evaluate(&full_trd(), &StructuralOptions::default());
        assert_eq!(outcome.points, 15);
        assert!(outcome.findings.is_empty());
    }

    #[test]
    fn test_missing_sections_lose_points() {
        let doc = "# TRD\n## Project Overview\nshort\n";
        let outcome = evaluate(doc, &StructuralOptions::default());
        assert!(outcome.points < 6);
        assert!(outcome
            .findings
            .iter()
            .any(|f| f.contains("missing required section")));
    }

    #[test]
    fn test_out_of_order_sections_flagged() {
        let filler = "x".repeat(150);
        let mut doc = String::from("# TRD\n");
        let mut reversed: Vec<&str> = TRD_SECTIONS.to_vec();
        reversed.reverse();
        for section in reversed {
            doc.push_str(&format!("## {}\n{}\n", section, filler));
        }
        let outcome = evaluate(&doc, &StructuralOptions::default());
        assert!(outcome
            .findings
            .iter()
            .any(|f| f.contains("out of order")));
    }

    #[test]
    fn test_endpoint_count_enforced() {
        let mut doc = full_trd();
        doc = doc.replace("GET /api/users\nPOST /api/users\nDELETE /api/users/{id}\n", "GET /api/users\n");
        let outcome = evaluate(&doc, &StructuralOptions::default());
        assert!(outcome
            .findings
            .iter()
            .any(|f| f.contains("minimum 3")));
        assert!(outcome.points < 15);
    }
}
