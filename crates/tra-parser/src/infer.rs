//! API inference: merge extracted calls with PRD/design entity hints into a
//! canonical endpoint list.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tra_core::code::model::{
    ApiEndpoint, ApiModel, CallOrigin, HttpMethod, ParsedCodeModel,
};
use tracing::debug;

fn entity_bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*[-*]\s*\*{0,2}([A-Z][A-Za-z]+)\*{0,2}\s*(?::|$|\s)").unwrap())
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?mi)^#{1,4}\s.*(entit|model|schema)").unwrap())
}

fn pluralize(entity: &str) -> String {
    let lower = entity.to_lowercase();
    if lower.ends_with('s') {
        lower
    } else if lower.ends_with('y') {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Extract entity names from bullet lists under entity/model/schema headings.
pub fn extract_entities(documents: &[&str]) -> Vec<String> {
    let mut entities = Vec::new();
    for doc in documents {
        // Find sections whose heading mentions entities/models/schema, then
        // collect capitalised bullet items until the next heading.
        for heading in heading_re().find_iter(doc) {
            let section_start = heading.end();
            let section_end = doc[section_start..]
                .find("\n#")
                .map(|i| section_start + i)
                .unwrap_or(doc.len());
            for captures in entity_bullet_re().captures_iter(&doc[section_start..section_end]) {
                let name = captures[1].to_string();
                if !entities.contains(&name) {
                    entities.push(name);
                }
            }
        }
    }
    entities
}

/// Infers the canonical endpoint list for a session.
#[derive(Debug, Default)]
pub struct ApiInferrer;

impl ApiInferrer {
    pub fn new() -> Self {
        Self
    }

    /// Digest over the canonicalised component and call lists. Computable
    /// before inference runs, so it doubles as the cache key.
    pub fn components_digest(parsed: &ParsedCodeModel) -> String {
        let mut names: Vec<&str> = parsed.components.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        let mut hasher = Sha256::new();
        for name in names {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        let mut calls: Vec<String> = parsed
            .api_calls
            .iter()
            .map(|c| format!("{} {}", c.method, c.endpoint))
            .collect();
        calls.sort_unstable();
        for call in calls {
            hasher.update(call.as_bytes());
            hasher.update([0u8]);
        }
        hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Merge parser output with document hints. Deduplicates by
    /// (method, path); extracted calls win over synthesised CRUD routes.
    pub fn infer(
        &self,
        parsed: &ParsedCodeModel,
        prd_text: &str,
        design_docs: &BTreeMap<String, String>,
    ) -> ApiModel {
        let mut endpoints: BTreeMap<(HttpMethod, String), ApiEndpoint> = BTreeMap::new();
        let auth_required = {
            let lower = prd_text.to_lowercase();
            lower.contains("auth") || lower.contains("login") || lower.contains("log in")
        };

        for call in &parsed.api_calls {
            let (summary, request_schema) = match &call.origin {
                CallOrigin::Graphql { operation_name, .. } => (
                    format!("GraphQL operation {}", operation_name),
                    call.body_shape.clone(),
                ),
                CallOrigin::Rest => (
                    format!("Extracted from {}", call.call_site.file),
                    call.body_shape.clone(),
                ),
            };
            let needs_review = request_schema.is_none() && call.method != HttpMethod::Get;
            endpoints
                .entry((call.method, call.endpoint.clone()))
                .or_insert(ApiEndpoint {
                    method: call.method,
                    path: call.endpoint.clone(),
                    summary,
                    request_schema,
                    response_schema: call.response_hint.clone(),
                    auth_required,
                    needs_review,
                });
        }

        // Entities named in the documents fill in CRUD routes the code did
        // not exercise; unknown schemas are flagged for the TRD generator.
        let mut documents: Vec<&str> = vec![prd_text];
        documents.extend(design_docs.values().map(String::as_str));
        for entity in extract_entities(&documents) {
            let plural = pluralize(&entity);
            let routes = [
                (HttpMethod::Get, format!("/api/{}", plural), format!("List {}", plural)),
                (HttpMethod::Post, format!("/api/{}", plural), format!("Create a {}", entity.to_lowercase())),
                (HttpMethod::Get, format!("/api/{}/{{id}}", plural), format!("Fetch one {}", entity.to_lowercase())),
                (HttpMethod::Put, format!("/api/{}/{{id}}", plural), format!("Update a {}", entity.to_lowercase())),
                (HttpMethod::Delete, format!("/api/{}/{{id}}", plural), format!("Delete a {}", entity.to_lowercase())),
            ];
            for (method, path, summary) in routes {
                endpoints.entry((method, path.clone())).or_insert(ApiEndpoint {
                    method,
                    path,
                    summary,
                    request_schema: None,
                    response_schema: None,
                    auth_required,
                    needs_review: true,
                });
            }
        }

        let model = ApiModel {
            endpoints: endpoints.into_values().collect(),
            components_digest: Self::components_digest(parsed),
        };
        debug!(endpoints = model.endpoints.len(), "api model inferred");
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tra_core::code::model::{ApiCall, CallSite};

    fn parsed_with_calls(calls: Vec<ApiCall>) -> ParsedCodeModel {
        ParsedCodeModel {
            api_calls: calls,
            ..Default::default()
        }
    }

    fn rest_call(method: HttpMethod, endpoint: &str) -> ApiCall {
        ApiCall {
            method,
            endpoint: endpoint.to_string(),
            body_shape: None,
            response_hint: None,
            call_site: CallSite {
                file: "a.ts".to_string(),
                line: 1,
            },
            origin: CallOrigin::Rest,
        }
    }

    #[test]
    fn test_dedup_by_method_and_path() {
        let parsed = parsed_with_calls(vec![
            rest_call(HttpMethod::Get, "/api/users"),
            rest_call(HttpMethod::Get, "/api/users"),
            rest_call(HttpMethod::Post, "/api/users"),
        ]);
        let model = ApiInferrer::new().infer(&parsed, "", &BTreeMap::new());
        assert_eq!(model.endpoints.len(), 2);
    }

    #[test]
    fn test_entities_synthesise_crud() {
        let mut docs = BTreeMap::new();
        docs.insert(
            "data-model".to_string(),
            "## Entities\n- **Order**: a customer order\n- Invoice\n".to_string(),
        );
        let model = ApiInferrer::new().infer(&ParsedCodeModel::default(), "", &docs);
        let paths: Vec<&str> = model.endpoints.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"/api/orders"));
        assert!(paths.contains(&"/api/orders/{id}"));
        assert!(paths.contains(&"/api/invoices"));
        assert!(model.endpoints.iter().all(|e| e.needs_review));
    }

    #[test]
    fn test_extracted_call_wins_over_synthesised() {
        let mut docs = BTreeMap::new();
        docs.insert(
            "data-model".to_string(),
            "## Entities\n- User\n".to_string(),
        );
        let mut call = rest_call(HttpMethod::Get, "/api/users");
        call.response_hint = Some("User[]".to_string());
        let parsed = parsed_with_calls(vec![call]);
        let model = ApiInferrer::new().infer(&parsed, "", &docs);

        let users_list = model
            .endpoints
            .iter()
            .find(|e| e.method == HttpMethod::Get && e.path == "/api/users")
            .unwrap();
        assert_eq!(users_list.response_schema.as_deref(), Some("User[]"));
        assert!(users_list.summary.starts_with("Extracted from"));
    }

    #[test]
    fn test_auth_flag_follows_prd() {
        let parsed = parsed_with_calls(vec![rest_call(HttpMethod::Get, "/api/items")]);
        let with_auth = ApiInferrer::new().infer(&parsed, "Users must log in.", &BTreeMap::new());
        assert!(with_auth.endpoints[0].auth_required);
        let without = ApiInferrer::new().infer(&parsed, "Public data.", &BTreeMap::new());
        assert!(!without.endpoints[0].auth_required);
    }

    #[test]
    fn test_digest_is_stable() {
        let parsed = parsed_with_calls(vec![rest_call(HttpMethod::Get, "/api/items")]);
        let a = ApiInferrer::new().infer(&parsed, "", &BTreeMap::new());
        let b = ApiInferrer::new().infer(&parsed, "", &BTreeMap::new());
        assert_eq!(a.components_digest, b.components_digest);
    }
}
