//! Component extraction: names, destructured props, hook usage, and inline
//! GraphQL queries per component.

use regex::Regex;
use std::sync::OnceLock;
use tra_core::code::model::ComponentInfo;

fn declaration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // `function Name(` / `const Name = (` / `const Name = React.forwardRef` /
        // `const Name: React.FC`; component names start with a capital.
        Regex::new(
            r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:function\s+([A-Z]\w*)\s*\(|const\s+([A-Z]\w*)\s*(?::\s*React\.\w+[^=]*)?=)",
        )
        .unwrap()
    })
}

fn hook_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(use[A-Z]\w*)\s*\(").unwrap())
}

fn props_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\(?\s*\{([^}]*)\}").unwrap())
}

fn gql_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\bgql\s*`([^`]*)`").unwrap())
}

/// Extract components from one file.
///
/// Each component owns the source slice from its declaration to the next
/// declaration; hooks and inline queries are attributed per slice.
pub fn extract_components(source: &str, file: &str) -> Vec<ComponentInfo> {
    let mut declarations: Vec<(usize, usize, String)> = Vec::new();
    for captures in declaration_re().captures_iter(source) {
        let whole = captures.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let name = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str().to_string());
        if let Some(name) = name {
            // SCREAMING_CASE consts (query documents, config) are not
            // components.
            if name.chars().all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit()) {
                continue;
            }
            declarations.push((whole.0, whole.1, name));
        }
    }

    let mut components = Vec::new();
    for (index, (start, decl_end, name)) in declarations.iter().enumerate() {
        let end = declarations
            .get(index + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(source.len());
        let body = &source[*start..end];

        let mut hooks: Vec<String> = hook_re()
            .captures_iter(body)
            .map(|c| c[1].to_string())
            .collect();
        hooks.sort();
        hooks.dedup();

        // Destructured props in the first argument position, right after the
        // declaration head.
        let mut props_end = end.min(*decl_end + 200);
        while !source.is_char_boundary(props_end) {
            props_end -= 1;
        }
        let after_decl = &source[*decl_end..props_end];
        let props = props_re()
            .captures(after_decl)
            .map(|c| {
                c[1].split(',')
                    .map(|p| {
                        p.trim()
                            .split(&[':', '='][..])
                            .next()
                            .unwrap_or("")
                            .trim()
                            .to_string()
                    })
                    .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_alphanumeric() || c == '_'))
                    .collect()
            })
            .unwrap_or_default();

        let inline_queries: Vec<String> = gql_re()
            .captures_iter(body)
            .map(|c| c[1].trim().to_string())
            .collect();

        components.push(ComponentInfo {
            name: name.clone(),
            file: file.to_string(),
            props,
            hooks,
            inline_queries,
        });
    }

    components
}
