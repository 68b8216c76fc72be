//! GraphQL operation extraction and normalisation to synthetic REST calls.

use crate::imports;
use regex::Regex;
use std::sync::OnceLock;
use tra_core::code::model::{ApiCall, CallOrigin, CallSite, HttpMethod};

/// Module names whose presence marks a file as using a GraphQL client.
const GRAPHQL_CLIENT_MODULES: &[&str] = &[
    "@apollo/client",
    "graphql-request",
    "urql",
    "@urql/core",
    "graphql-tag",
];

fn gql_template_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\bgql\s*`([^`]*)`").unwrap())
}

fn operation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(query|mutation|subscription)\s*([A-Za-z_]\w*)?").unwrap()
    })
}

fn first_field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\s*([A-Za-z_]\w*)").unwrap())
}

/// Whether the file imports a known GraphQL client.
///
/// Files without one are skipped entirely, so a stray `gql` identifier in
/// unrelated code cannot produce operations.
pub fn uses_graphql_client(source: &str, file: &str) -> bool {
    imports::extract_imports(source, file).iter().any(|import| {
        GRAPHQL_CLIENT_MODULES
            .iter()
            .any(|module| import.module == *module)
            || import.default_import.as_deref() == Some("gql")
            || import.named.iter().any(|n| n == "gql")
    })
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Extract GraphQL operations as synthetic `POST /graphql` calls.
///
/// The operation name rides in the call record; the original operation text
/// is preserved for the OpenAPI generator.
pub fn extract_graphql_calls(source: &str, file: &str) -> Vec<ApiCall> {
    if !uses_graphql_client(source, file) {
        return Vec::new();
    }

    let mut calls = Vec::new();
    for captures in gql_template_re().captures_iter(source) {
        let offset = captures.get(0).map(|m| m.start()).unwrap_or(0);
        let operation_text = captures[1].trim().to_string();
        if operation_text.is_empty() {
            continue;
        }

        let operation_name = operation_re()
            .captures(&operation_text)
            .and_then(|c| c.get(2).map(|m| m.as_str().to_string()))
            .or_else(|| {
                first_field_re()
                    .captures(&operation_text)
                    .map(|c| c[1].to_string())
            })
            .unwrap_or_else(|| "UnnamedOperation".to_string());

        calls.push(ApiCall {
            method: HttpMethod::Post,
            endpoint: "/graphql".to_string(),
            body_shape: Some(format!("graphql:{}", operation_name)),
            response_hint: None,
            call_site: CallSite {
                file: file.to_string(),
                line: line_of(source, offset),
            },
            origin: CallOrigin::Graphql {
                operation_name,
                operation_text,
            },
        });
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;

    const APOLLO_FILE: &str = r#"
import { gql, useQuery } from '@apollo/client';

const GET_USERS = gql`
  query GetUsers($limit: Int) {
    users(limit: $limit) { id name }
  }
`;

const ADD_USER = gql`
  mutation AddUser($input: UserInput!) {
    addUser(input: $input) { id }
  }
`;
"#;

    #[test]
    fn test_apollo_operations_normalised() {
        let calls = extract_graphql_calls(APOLLO_FILE, "users.ts");
        assert_eq!(calls.len(), 2);
        for call in &calls {
            assert_eq!(call.method, HttpMethod::Post);
            assert_eq!(call.endpoint, "/graphql");
        }
        match &calls[0].origin {
            CallOrigin::Graphql { operation_name, operation_text } => {
                assert_eq!(operation_name, "GetUsers");
                assert!(operation_text.contains("users(limit: $limit)"));
            }
            CallOrigin::Rest => panic!("expected graphql origin"),
        }
    }

    #[test]
    fn test_no_client_import_rejects_gql_identifier() {
        // `gql` appears but no GraphQL client is imported.
        let source = "const gql = makeTag();\nconst q = gql`query Q { field }`;";
        assert!(extract_graphql_calls(source, "fake.ts").is_empty());
    }

    #[test]
    fn test_anonymous_operation_uses_first_field() {
        let source = "import { gql } from 'graphql-request';\nconst q = gql`{ currentUser { id } }`;";
        let calls = extract_graphql_calls(source, "q.ts");
        assert_eq!(calls.len(), 1);
        match &calls[0].origin {
            CallOrigin::Graphql { operation_name, .. } => {
                assert_eq!(operation_name, "currentUser");
            }
            CallOrigin::Rest => panic!("expected graphql origin"),
        }
    }
}
