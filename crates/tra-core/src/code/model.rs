//! Parsed-code and inferred-API models.

use serde::{Deserialize, Serialize};

/// HTTP verb of an extracted or inferred endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of an extracted call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub file: String,
    /// 1-based line number.
    pub line: usize,
}

/// Where an API call came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallOrigin {
    Rest,
    /// GraphQL operation normalised to `POST /graphql`; the original
    /// operation text is preserved for the OpenAPI generator.
    Graphql {
        operation_name: String,
        operation_text: String,
    },
}

/// One extracted REST or normalised GraphQL call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCall {
    pub method: HttpMethod,
    pub endpoint: String,
    pub body_shape: Option<String>,
    pub response_hint: Option<String>,
    pub call_site: CallSite,
    pub origin: CallOrigin,
}

/// A UI component found in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub file: String,
    pub props: Vec<String>,
    pub hooks: Vec<String>,
    pub inline_queries: Vec<String>,
}

/// An import statement, covering default, named, namespace, and mixed forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportInfo {
    pub module: String,
    pub default_import: Option<String>,
    pub named: Vec<String>,
    pub namespace: Option<String>,
    pub file: String,
}

/// A file skipped during parsing, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// Deterministic output of the code parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedCodeModel {
    pub components: Vec<ComponentInfo>,
    pub api_calls: Vec<ApiCall>,
    pub imports: Vec<ImportInfo>,
    pub skipped_files: Vec<SkippedFile>,
    /// sha256 of the archive contents, used as the cache key.
    pub source_digest: String,
}

impl ParsedCodeModel {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.api_calls.is_empty() && self.imports.is_empty()
    }
}

/// A canonical endpoint in the inferred API model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub method: HttpMethod,
    pub path: String,
    pub summary: String,
    /// JSON-ish shape description; `None` means unknown.
    pub request_schema: Option<String>,
    pub response_schema: Option<String>,
    pub auth_required: bool,
    /// Set when schemas could not be inferred so the TRD generator prompts
    /// for them.
    pub needs_review: bool,
}

/// Canonical endpoint list merged from parser output and document hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiModel {
    pub endpoints: Vec<ApiEndpoint>,
    /// sha256 over the canonicalised component list, used as the cache key.
    pub components_digest: String,
}
