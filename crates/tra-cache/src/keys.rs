//! Cache key construction.

use sha2::{Digest, Sha256};

/// Hex-encoded sha256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Key for a technology-research entry:
/// `tech_research:{category}:{hash(project-type, existing-stack, requirements-digest)}`.
///
/// The stack list is sorted before hashing so ordering differences in the
/// caller do not split the cache.
pub fn research_key(
    category: &str,
    project_type: &str,
    existing_stack: &[String],
    requirements_digest: &str,
) -> String {
    let mut stack: Vec<&str> = existing_stack.iter().map(String::as_str).collect();
    stack.sort_unstable();
    let material = format!("{}\x1f{}\x1f{}", project_type, stack.join(","), requirements_digest);
    let digest = sha256_hex(material.as_bytes());
    format!("tech_research:{}:{}", category, &digest[..16])
}

/// Key for a code-analysis entry: `code_analysis:{sha256(archive-contents)}`.
pub fn code_analysis_key(archive_digest: &str) -> String {
    format!("code_analysis:{}", archive_digest)
}

/// Key for an API-inference entry:
/// `api_inference:{sha256(canonical(component-list))}`.
pub fn api_inference_key(components_digest: &str) -> String {
    format!("api_inference:{}", components_digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_research_key_ignores_stack_order() {
        let a = research_key(
            "database",
            "saas",
            &["react".to_string(), "node".to_string()],
            "abc",
        );
        let b = research_key(
            "database",
            "saas",
            &["node".to_string(), "react".to_string()],
            "abc",
        );
        assert_eq!(a, b);
        assert!(a.starts_with("tech_research:database:"));
    }

    #[test]
    fn test_research_key_varies_by_context() {
        let a = research_key("database", "saas", &[], "abc");
        let b = research_key("database", "saas", &[], "abd");
        assert_ne!(a, b);
    }
}
