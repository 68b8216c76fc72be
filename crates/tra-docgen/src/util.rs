//! Shared output-handling helpers.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

/// Pull a JSON object out of LLM output.
///
/// Accepts bare JSON, JSON inside ```json fences, or JSON with surrounding
/// prose; returns the outermost `{...}` slice.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Strip a single markdown code fence when the whole output is fenced.
pub fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.strip_suffix("```").map(str::trim).unwrap_or(trimmed)
}

/// Split a markdown document into its `##`-level sections.
///
/// Returns (heading text, raw body slice) pairs in document order; content
/// before the first `##` heading is ignored.
pub fn split_sections(markdown: &str) -> Vec<(String, String)> {
    let mut headings: Vec<(String, std::ops::Range<usize>)> = Vec::new();
    let mut in_h2 = false;
    let mut current = String::new();
    let mut current_range = 0..0;

    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level: HeadingLevel::H2, .. }) => {
                in_h2 = true;
                current.clear();
                current_range = range;
            }
            Event::Text(text) if in_h2 => current.push_str(&text),
            Event::End(TagEnd::Heading(HeadingLevel::H2)) => {
                in_h2 = false;
                headings.push((current.clone(), current_range.clone()));
            }
            _ => {}
        }
    }

    headings
        .iter()
        .enumerate()
        .map(|(index, (heading, range))| {
            let body_start = range.end;
            let body_end = headings
                .get(index + 1)
                .map(|(_, next)| next.start)
                .unwrap_or(markdown.len());
            (heading.clone(), markdown[body_start..body_end].trim().to_string())
        })
        .collect()
}

/// Body of one named `##` section, if present.
pub fn section_body(markdown: &str, name: &str) -> Option<String> {
    split_sections(markdown)
        .into_iter()
        .find(|(heading, _)| heading == name)
        .map(|(_, body)| body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fences() {
        let text = "Here you go:\n```json\n{\"score\": 91}\n```\nDone.";
        assert_eq!(extract_json_block(text), Some("{\"score\": 91}"));
    }

    #[test]
    fn test_extract_json_bare() {
        assert_eq!(extract_json_block("{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(extract_json_block("no json here"), None);
    }

    #[test]
    fn test_strip_fence() {
        assert_eq!(strip_fence("```sql\nCREATE TABLE t;\n```"), "CREATE TABLE t;");
        assert_eq!(strip_fence("plain text"), "plain text");
    }

    const DOC: &str = "# Title\nintro\n\n## First Section\nbody one\n\n### Sub\nnested\n\n## Second Section\nbody two\n";

    #[test]
    fn test_split_sections() {
        let sections = split_sections(DOC);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "First Section");
        assert!(sections[0].1.contains("body one"));
        assert!(sections[0].1.contains("nested"));
        assert_eq!(sections[1].0, "Second Section");
        assert_eq!(sections[1].1, "body two");
    }

    #[test]
    fn test_section_body_lookup() {
        assert!(section_body(DOC, "Second Section").is_some());
        assert!(section_body(DOC, "Missing").is_none());
    }
}
