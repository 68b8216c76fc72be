//! REST call extraction: `fetch` and `axios` patterns.

use regex::Regex;
use std::sync::OnceLock;
use tra_core::code::model::{ApiCall, CallOrigin, CallSite, HttpMethod};

fn fetch_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bfetch\(\s*[`'"]([^`'"]+)[`'"]"#).unwrap())
}

fn method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"method:\s*['"](GET|POST|PUT|PATCH|DELETE)['"]"#).unwrap()
    })
}

fn body_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"body:\s*(?:JSON\.stringify\(\s*([A-Za-z_][\w.]*)|([A-Za-z_][\w.]*))").unwrap())
}

fn axios_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\baxios\.(get|post|put|patch|delete)\(\s*[`'"]([^`'"]+)[`'"]\s*(?:,\s*([A-Za-z_][\w.]*))?"#)
            .unwrap()
    })
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Normalise a URL template: `${id}` interpolations become `{id}` path
/// parameters, and any host prefix is dropped.
pub fn normalize_endpoint(raw: &str) -> String {
    static INTERP: OnceLock<Regex> = OnceLock::new();
    let interp = INTERP.get_or_init(|| Regex::new(r"\$\{\s*[\w.]*?(\w+)\s*\}").unwrap());
    let replaced = interp.replace_all(raw, "{$1}");
    match replaced.find("://").and_then(|i| replaced[i + 3..].find('/')) {
        Some(slash) => {
            let host_start = replaced.find("://").map(|i| i + 3).unwrap_or(0);
            replaced[host_start + slash..].to_string()
        }
        None if replaced.contains("://") => "/".to_string(),
        None => replaced.to_string(),
    }
}

/// Extract direct REST calls (verb + URL template + body argument).
pub fn extract_rest_calls(source: &str, file: &str) -> Vec<ApiCall> {
    let mut calls = Vec::new();

    for captures in fetch_re().captures_iter(source) {
        let whole = captures.get(0).map(|m| m.start()).unwrap_or(0);
        let url = &captures[1];
        // Options object, when present, sits within the next few lines.
        let mut window_end = (whole + 300).min(source.len());
        while !source.is_char_boundary(window_end) {
            window_end -= 1;
        }
        let window = &source[whole..window_end];
        let method = method_re()
            .captures(window)
            .and_then(|c| HttpMethod::parse(&c[1]))
            .unwrap_or(HttpMethod::Get);
        let body_shape = body_re().captures(window).map(|c| {
            c.get(1)
                .or_else(|| c.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        });

        calls.push(ApiCall {
            method,
            endpoint: normalize_endpoint(url),
            body_shape,
            response_hint: None,
            call_site: CallSite {
                file: file.to_string(),
                line: line_of(source, whole),
            },
            origin: CallOrigin::Rest,
        });
    }

    for captures in axios_re().captures_iter(source) {
        let whole = captures.get(0).map(|m| m.start()).unwrap_or(0);
        let method = HttpMethod::parse(&captures[1]).unwrap_or(HttpMethod::Get);
        let body_shape = match method {
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                captures.get(3).map(|m| m.as_str().to_string())
            }
            _ => None,
        };

        calls.push(ApiCall {
            method,
            endpoint: normalize_endpoint(&captures[2]),
            body_shape,
            response_hint: None,
            call_site: CallSite {
                file: file.to_string(),
                line: line_of(source, whole),
            },
            origin: CallOrigin::Rest,
        });
    }

    calls.sort_by(|a, b| a.call_site.line.cmp(&b.call_site.line));
    calls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_defaults_to_get() {
        let calls = extract_rest_calls("await fetch('/api/users');", "a.ts");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, HttpMethod::Get);
        assert_eq!(calls[0].endpoint, "/api/users");
        assert!(calls[0].body_shape.is_none());
    }

    #[test]
    fn test_fetch_with_method_and_body() {
        let source = r#"
fetch('/api/users', {
  method: 'POST',
  headers: { 'Content-Type': 'application/json' },
  body: JSON.stringify(newUser),
});
"#;
        let calls = extract_rest_calls(source, "a.ts");
        assert_eq!(calls[0].method, HttpMethod::Post);
        assert_eq!(calls[0].body_shape.as_deref(), Some("newUser"));
        assert_eq!(calls[0].call_site.line, 2);
    }

    #[test]
    fn test_template_interpolation_becomes_path_param() {
        let calls = extract_rest_calls("fetch(`/api/users/${user.id}/orders`);", "a.ts");
        assert_eq!(calls[0].endpoint, "/api/users/{id}/orders");
    }

    #[test]
    fn test_axios_verbs_and_body() {
        let source = "axios.get('/api/orders');\naxios.post('/api/orders', payload);";
        let calls = extract_rest_calls(source, "client.ts");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, HttpMethod::Get);
        assert_eq!(calls[1].method, HttpMethod::Post);
        assert_eq!(calls[1].body_shape.as_deref(), Some("payload"));
    }

    #[test]
    fn test_absolute_url_loses_host() {
        let calls = extract_rest_calls("fetch('https://api.example.com/v1/items');", "a.ts");
        assert_eq!(calls[0].endpoint, "/v1/items");
    }
}
