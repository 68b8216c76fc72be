//! Import extraction: default, named, namespace, and mixed forms.

use regex::Regex;
use std::sync::OnceLock;
use tra_core::code::model::ImportInfo;

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*import\s+(?:type\s+)?([^'"]+?)\s+from\s+['"]([^'"]+)['"]"#)
            .unwrap()
    })
}

/// Split a named-import clause body `a, b as c` into local names.
fn named_list(body: &str) -> Vec<String> {
    body.split(',')
        .map(|part| {
            let part = part.trim();
            match part.split_once(" as ") {
                Some((_, local)) => local.trim().to_string(),
                None => part.to_string(),
            }
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Extract all `import ... from '...'` statements in a file.
///
/// Handles:
/// - `import Default from 'mod'`
/// - `import { a, b as c } from 'mod'`
/// - `import * as ns from 'mod'`
/// - `import Default, { a } from 'mod'` (mixed)
/// - `import Default, * as ns from 'mod'`
pub fn extract_imports(source: &str, file: &str) -> Vec<ImportInfo> {
    let mut imports = Vec::new();

    for captures in import_re().captures_iter(source) {
        let clause = captures[1].trim();
        let module = captures[2].to_string();

        let mut info = ImportInfo {
            module,
            default_import: None,
            named: Vec::new(),
            namespace: None,
            file: file.to_string(),
        };

        let mut rest = clause;
        // Leading default import (mixed form peels it off before the comma).
        if !rest.starts_with('{') && !rest.starts_with('*') {
            match rest.split_once(',') {
                Some((default, tail)) => {
                    info.default_import = Some(default.trim().to_string());
                    rest = tail.trim();
                }
                None => {
                    info.default_import = Some(rest.trim().to_string());
                    rest = "";
                }
            }
        }

        if let Some(body) = rest.strip_prefix('{') {
            if let Some(body) = body.strip_suffix('}') {
                info.named = named_list(body);
            }
        } else if let Some(ns) = rest.strip_prefix("* as ") {
            info.namespace = Some(ns.trim().to_string());
        }

        imports.push(info);
    }

    imports
}
