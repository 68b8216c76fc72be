//! The code parser: archive in, deterministic model out.

use crate::{archive, components, graphql, imports, rest, strip};
use sha2::{Digest, Sha256};
use std::path::Path;
use tra_core::code::model::ParsedCodeModel;
use tracing::{debug, info};

/// Parses an uploaded code archive into a [`ParsedCodeModel`].
///
/// The output is deterministic: files are processed in path order and the
/// archive digest is computed over sorted (path, content) pairs, so the same
/// archive always hashes to the same cache key.
#[derive(Debug, Default)]
pub struct CodeParser;

impl CodeParser {
    pub fn new() -> Self {
        Self
    }

    /// Digest over the archive contents without running the extractors.
    /// Matches `source_digest` on the parsed model for the same archive.
    pub fn archive_digest(&self, archive_path: &Path) -> String {
        let (files, _skipped) = archive::load_archive(archive_path);
        let mut hasher = Sha256::new();
        for file in &files {
            hasher.update(file.path.as_bytes());
            hasher.update([0u8]);
            hasher.update(file.content.as_bytes());
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    pub fn parse(&self, archive_path: &Path) -> ParsedCodeModel {
        let (files, mut skipped) = archive::load_archive(archive_path);

        let mut hasher = Sha256::new();
        let mut model = ParsedCodeModel::default();

        for file in &files {
            hasher.update(file.path.as_bytes());
            hasher.update([0u8]);
            hasher.update(file.content.as_bytes());

            let source = strip::strip_comments(&file.content);
            model.imports.extend(imports::extract_imports(&source, &file.path));
            model
                .components
                .extend(components::extract_components(&source, &file.path));
            model.api_calls.extend(rest::extract_rest_calls(&source, &file.path));
            model
                .api_calls
                .extend(graphql::extract_graphql_calls(&source, &file.path));
        }

        model
            .api_calls
            .sort_by(|a, b| (&a.call_site.file, a.call_site.line).cmp(&(&b.call_site.file, b.call_site.line)));
        model.skipped_files.append(&mut skipped);
        model.source_digest = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();

        if model.is_empty() && model.skipped_files.is_empty() {
            debug!(path = %archive_path.display(), "archive produced an empty model");
        } else {
            info!(
                components = model.components.len(),
                api_calls = model.api_calls.len(),
                imports = model.imports.len(),
                skipped = model.skipped_files.len(),
                "code archive parsed"
            );
        }
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tra_core::code::model::{CallOrigin, HttpMethod};

    fn write_fixture(dir: &Path) {
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::write(
            dir.join("src/UserList.tsx"),
            r#"
import React, { useState, useEffect } from 'react';
import axios from 'axios';

export function UserList({ teamId }) {
  const [users, setUsers] = useState([]);
  useEffect(() => {
    axios.get(`/api/teams/${teamId}/users`).then(r => setUsers(r.data));
  }, [teamId]);
  return null;
}
"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("src/queries.ts"),
            r#"
import { gql } from '@apollo/client';

export const ORDER_QUERY = gql`
  query OrdersByUser($userId: ID!) {
    orders(userId: $userId) { id total }
  }
`;
"#,
        )
        .unwrap();
    }

    #[test]
    fn test_parse_full_fixture() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let model = CodeParser::new().parse(dir.path());
        assert_eq!(model.components.len(), 1);
        assert_eq!(model.components[0].name, "UserList");

        let rest: Vec<_> = model
            .api_calls
            .iter()
            .filter(|c| c.origin == CallOrigin::Rest)
            .collect();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].method, HttpMethod::Get);
        assert_eq!(rest[0].endpoint, "/api/teams/{teamId}/users");

        let graphql: Vec<_> = model
            .api_calls
            .iter()
            .filter(|c| matches!(c.origin, CallOrigin::Graphql { .. }))
            .collect();
        assert_eq!(graphql.len(), 1);
        assert_eq!(graphql[0].endpoint, "/graphql");

        assert!(!model.source_digest.is_empty());
    }

    #[test]
    fn test_same_archive_same_digest() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let first = CodeParser::new().parse(dir.path());
        let second = CodeParser::new().parse(dir.path());
        assert_eq!(first.source_digest, second.source_digest);
    }

    #[test]
    fn test_missing_archive_is_empty_model() {
        let model = CodeParser::new().parse(Path::new("/does/not/exist"));
        assert!(model.is_empty());
        assert!(model.skipped_files.is_empty());
    }
}
