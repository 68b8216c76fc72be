//! Pure fallback builders for non-critical generator failures.

use std::collections::BTreeSet;
use tra_core::artifact::model::SqlSchema;
use tra_core::session::model::Session;
use tra_docgen::TRD_SECTIONS;

/// Minimal TRD skeleton: every required section present with the facts the
/// session already holds, flagged for human completion.
pub fn trd_skeleton(session: &Session) -> String {
    let mut doc = String::from("# Technical Requirements Document\n\n");
    for section in TRD_SECTIONS {
        doc.push_str(&format!("## {}\n\n", section));
        match *section {
            "Technology Stack" => {
                for (category, choice) in &session.selected_technologies {
                    doc.push_str(&format!(
                        "- {}: {} (version: TBD){}\n",
                        category,
                        choice.option_name,
                        choice
                            .rationale
                            .as_deref()
                            .map(|r| format!(" — {}", r))
                            .unwrap_or_default()
                    ));
                }
            }
            "API Specification" => {
                if let Some(api) = &session.inferred_api {
                    for endpoint in &api.endpoints {
                        doc.push_str(&format!(
                            "{} {} — {}\n",
                            endpoint.method, endpoint.path, endpoint.summary
                        ));
                    }
                }
            }
            _ => {}
        }
        doc.push_str("_Generation degraded; section requires human completion._\n\n");
    }
    doc
}

/// Minimal OpenAPI 3.x document from the inferred endpoint list.
pub fn openapi_fallback(session: &Session) -> String {
    let mut paths = serde_json::Map::new();
    if let Some(api) = &session.inferred_api {
        for endpoint in &api.endpoints {
            let entry = paths
                .entry(endpoint.path.clone())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if let Some(operations) = entry.as_object_mut() {
                operations.insert(
                    endpoint.method.as_str().to_lowercase(),
                    serde_json::json!({
                        "summary": endpoint.summary,
                        "responses": { "200": { "description": "OK" } }
                    }),
                );
            }
        }
    }
    let doc = serde_json::json!({
        "openapi": "3.0.3",
        "info": {
            "title": format!("API for project {}", session.project_id),
            "version": "0.1.0"
        },
        "paths": paths
    });
    serde_json::to_string_pretty(&doc).unwrap_or_else(|_| "{}".to_string())
}

fn entities_from_paths(session: &Session) -> BTreeSet<String> {
    let mut entities = BTreeSet::new();
    if let Some(api) = &session.inferred_api {
        for endpoint in &api.endpoints {
            if let Some(segment) = endpoint
                .path
                .trim_start_matches("/api/")
                .split('/')
                .next()
            {
                let name = segment.trim();
                if !name.is_empty() && !name.starts_with('{') && name != "graphql" {
                    entities.insert(name.replace('-', "_"));
                }
            }
        }
    }
    entities
}

/// Minimal DDL plus ER diagram from the inferred entity names.
pub fn db_schema_fallback(session: &Session) -> SqlSchema {
    let entities = entities_from_paths(session);
    let mut ddl = String::new();
    let mut erd = String::from("erDiagram\n");
    for entity in &entities {
        ddl.push_str(&format!(
            "CREATE TABLE {} (\n    id TEXT PRIMARY KEY,\n    created_at TEXT NOT NULL,\n    updated_at TEXT NOT NULL\n);\n\n",
            entity
        ));
        erd.push_str(&format!("    {} {{\n        TEXT id PK\n    }}\n", entity.to_uppercase()));
    }
    if entities.is_empty() {
        ddl.push_str("-- No entities inferred; schema requires human completion.\n");
    }
    SqlSchema {
        ddl: ddl.trim_end().to_string(),
        erd: erd.trim_end().to_string(),
    }
}

/// Minimal tech-stack document from the recorded selections.
pub fn tech_stack_fallback(session: &Session) -> String {
    let mut doc = String::from("# Technology Stack\n\n");
    for (category, choice) in &session.selected_technologies {
        doc.push_str(&format!("## {} ({})\n\n", choice.option_name, category));
        doc.push_str(&format!(
            "- Rationale: {}\n- Version: TBD\n- Documentation: official site\n- Integration notes: generation degraded; complete manually.\n\n",
            choice.rationale.as_deref().unwrap_or("selected during the decision loop")
        ));
    }
    doc.trim_end().to_string()
}
