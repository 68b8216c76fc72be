//! Technology researcher: per-gap option discovery and ranking.
//!
//! Research is cached for 24 hours by (category, context). When search is
//! unavailable the built-in catalogue substitutes for the common categories;
//! categories without a catalogue entry come back unresearched with an
//! explanation instead of failing the session.

use crate::error::NodeError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tra_cache::{research_key, sha256_hex, Cache};
use tra_core::config::{CacheConfig, LlmConfig, SearchConfig};
use tra_core::error::{ErrorKind, SessionError};
use tra_core::gap::model::{TechCategory, TechGap};
use tra_core::research::model::{LevelTag, QualityTag, ResearchResult, TechOption};
use tra_core::research::rank_options;
use tra_gateway::{CompletionRequest, LlmGateway, SearchGateway, SearchQuery};
use tracing::{debug, warn};

static RESEARCH_TEMPLATE: &str = include_str!("templates/research.tera");

/// Context shaping research queries and cache keys.
#[derive(Debug, Clone)]
pub struct ResearchContext {
    pub project_type: String,
    pub existing_stack: Vec<String>,
    pub requirements_digest: String,
}

impl ResearchContext {
    /// Derive from the session inputs: a coarse project type, the stack
    /// decided so far, and a digest of the PRD.
    pub fn from_inputs(prd_text: &str, existing_stack: Vec<String>) -> Self {
        let lower = prd_text.to_lowercase();
        let project_type = if lower.contains("mobile") {
            "mobile application"
        } else if lower.contains("cli") || lower.contains("command line") {
            "developer tool"
        } else {
            "web application"
        };
        Self {
            project_type: project_type.to_string(),
            existing_stack,
            requirements_digest: sha256_hex(prd_text.as_bytes())[..16].to_string(),
        }
    }
}

/// A research attempt: always yields a result; carries the recorded error
/// when the result is degraded.
pub struct ResearchOutcome {
    pub result: ResearchResult,
    pub error: Option<SessionError>,
}

/// One catalogue row: (name, description, popularity, curve, docs, integration).
type CatalogueRow = (&'static str, &'static str, u8, LevelTag, QualityTag, LevelTag);

fn catalogue(category: TechCategory) -> &'static [CatalogueRow] {
    use LevelTag::*;
    use QualityTag::*;
    match category {
        TechCategory::Authentication => &[
            ("Auth0", "Managed identity platform with broad protocol support", 85, Low, Excellent, Low),
            ("Keycloak", "Self-hosted open-source identity and access management", 70, High, Good, Medium),
            ("Supabase Auth", "Hosted auth bundled with the Supabase platform", 65, Low, Good, Low),
        ],
        TechCategory::Database => &[
            ("PostgreSQL", "Feature-rich open-source relational database", 95, Medium, Excellent, Medium),
            ("MySQL", "Widely deployed open-source relational database", 88, Medium, Good, Medium),
            ("MongoDB", "Document database for flexible schemas", 80, Low, Good, Low),
        ],
        TechCategory::Storage => &[
            ("AWS S3", "Durable managed object storage", 95, Low, Excellent, Low),
            ("MinIO", "Self-hosted S3-compatible object storage", 60, Medium, Good, Medium),
            ("Cloudflare R2", "Zero-egress-fee S3-compatible storage", 55, Low, Good, Low),
        ],
        TechCategory::Messaging => &[
            ("RabbitMQ", "Mature AMQP message broker", 80, Medium, Good, Medium),
            ("Apache Kafka", "Distributed event streaming platform", 85, High, Good, High),
            ("Redis Streams", "Lightweight streams on an existing Redis", 70, Low, Good, Low),
        ],
        TechCategory::Caching => &[
            ("Redis", "In-memory data store with rich structures", 95, Low, Excellent, Low),
            ("Memcached", "Simple distributed memory cache", 70, Low, Good, Low),
        ],
        TechCategory::Email => &[
            ("SendGrid", "Transactional email API with templates", 85, Low, Good, Low),
            ("Amazon SES", "Low-cost transactional email", 80, Medium, Good, Medium),
            ("Postmark", "Deliverability-focused transactional email", 60, Low, Excellent, Low),
        ],
        TechCategory::Payments => &[
            ("Stripe", "Full-featured payments platform", 95, Medium, Excellent, Medium),
            ("PayPal", "Ubiquitous consumer payments", 85, Low, Good, Low),
            ("Paddle", "Merchant-of-record billing for SaaS", 50, Medium, Good, Medium),
        ],
        TechCategory::Realtime => &[
            ("Socket.IO", "Websocket framework with fallbacks", 85, Low, Good, Low),
            ("Pusher", "Managed realtime channels", 70, Low, Good, Low),
            ("Ably", "Managed realtime messaging with delivery guarantees", 55, Medium, Good, Medium),
        ],
        // Remaining categories have no safe defaults.
        _ => &[],
    }
}

fn catalogue_result(category: TechCategory) -> Option<ResearchResult> {
    let rows = catalogue(category);
    if rows.is_empty() {
        return None;
    }
    let options = rows
        .iter()
        .map(|(name, description, popularity, curve, docs, integration)| TechOption {
            name: (*name).to_string(),
            description: (*description).to_string(),
            strengths: vec!["established option for this category".to_string()],
            weaknesses: vec!["catalogue entry; verify fit against requirements".to_string()],
            use_cases: Vec::new(),
            popularity: *popularity,
            learning_curve: *curve,
            documentation_quality: *docs,
            integration_complexity: *integration,
            sources: Vec::new(),
        })
        .collect();
    Some(ResearchResult {
        category,
        options,
        summary: format!("Built-in catalogue options for {} (search unavailable).", category),
        recommendation: None,
        from_catalogue: true,
    })
}

#[derive(Deserialize)]
struct LlmOption {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    use_cases: Vec<String>,
    #[serde(default)]
    popularity: u8,
    #[serde(default = "default_tag")]
    learning_curve: String,
    #[serde(default = "default_quality")]
    documentation_quality: String,
    #[serde(default = "default_tag")]
    integration_complexity: String,
    #[serde(default)]
    sources: Vec<String>,
}

fn default_tag() -> String {
    "medium".to_string()
}

fn default_quality() -> String {
    "good".to_string()
}

#[derive(Deserialize)]
struct LlmResearch {
    options: Vec<LlmOption>,
    #[serde(default)]
    summary: String,
}

/// Per-gap option discovery over the search and LLM gateways.
pub struct TechnologyResearcher {
    llm: Arc<dyn LlmGateway>,
    search: Arc<dyn SearchGateway>,
    cache: Cache,
    llm_config: LlmConfig,
    search_config: SearchConfig,
    cache_config: CacheConfig,
}

impl TechnologyResearcher {
    pub fn new(
        llm: Arc<dyn LlmGateway>,
        search: Arc<dyn SearchGateway>,
        cache: Cache,
        llm_config: LlmConfig,
        search_config: SearchConfig,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            llm,
            search,
            cache,
            llm_config,
            search_config,
            cache_config,
        }
    }

    /// Research one gap. Never fails the workflow: degraded paths return a
    /// catalogue result or an unresearched placeholder plus the error to
    /// record.
    pub async fn research(&self, gap: &TechGap, context: &ResearchContext) -> ResearchOutcome {
        let key = research_key(
            gap.category.as_str(),
            &context.project_type,
            &context.existing_stack,
            &context.requirements_digest,
        );

        if let Some(cached) = self.cache.get_json::<ResearchResult>(&key).await {
            debug!(category = %gap.category, "research cache hit");
            return ResearchOutcome {
                result: cached,
                error: None,
            };
        }

        match self.research_uncached(gap, context).await {
            Ok(mut result) => {
                rank_options(&mut result, &gap.candidate_hints);
                self.cache
                    .set_json(&key, &result, Duration::from_secs(self.cache_config.research_ttl_secs))
                    .await;
                ResearchOutcome {
                    result,
                    error: None,
                }
            }
            Err(node_error) => {
                warn!(category = %gap.category, error = %node_error, "research degraded");
                let mut result = catalogue_result(gap.category).unwrap_or_else(|| ResearchResult {
                    category: gap.category,
                    options: Vec::new(),
                    summary: format!(
                        "Research unavailable for {}: {}. Provide a decision manually.",
                        gap.category, node_error.message
                    ),
                    recommendation: None,
                    from_catalogue: false,
                });
                rank_options(&mut result, &gap.candidate_hints);
                ResearchOutcome {
                    result,
                    error: Some(SessionError::new(
                        node_error.kind,
                        "research_technologies",
                        node_error.message,
                    )),
                }
            }
        }
    }

    async fn research_uncached(
        &self,
        gap: &TechGap,
        context: &ResearchContext,
    ) -> Result<ResearchResult, NodeError> {
        let query = format!(
            "best {} technology for {} comparison",
            gap.category, context.project_type
        );
        let hits = self
            .search
            .search(SearchQuery {
                query,
                depth: self.search_config.depth.clone(),
                max_results: self.search_config.max_results,
            })
            .await
            .map_err(NodeError::from)?;

        let mut template_context = tera::Context::new();
        template_context.insert("category", gap.category.as_str());
        template_context.insert("project_type", &context.project_type);
        template_context.insert("existing_stack", &context.existing_stack.join(", "));
        template_context.insert("gap_description", &gap.description);
        template_context.insert("hits", &hits);
        let prompt = tera::Tera::one_off(RESEARCH_TEMPLATE, &template_context, false)
            .map_err(|e| NodeError::new(ErrorKind::LlmMalformedOutput, e.to_string()))?;

        let completion = self
            .llm
            .complete(CompletionRequest {
                prompt,
                model: self.llm_config.model.clone(),
                temperature: self.llm_config.temperature,
                max_tokens: self.llm_config.max_tokens,
            })
            .await
            .map_err(NodeError::from)?;

        let json = tra_docgen::util::extract_json_block(&completion.text).ok_or_else(|| {
            NodeError::new(ErrorKind::LlmMalformedOutput, "research output contains no JSON")
        })?;
        let parsed: LlmResearch = serde_json::from_str(json)
            .map_err(|e| NodeError::new(ErrorKind::LlmMalformedOutput, e.to_string()))?;
        if parsed.options.is_empty() {
            return Err(NodeError::new(
                ErrorKind::LlmMalformedOutput,
                "research produced no options",
            ));
        }

        let options = parsed
            .options
            .into_iter()
            .take(3)
            .map(|o| TechOption {
                name: o.name,
                description: o.description,
                strengths: o.strengths,
                weaknesses: o.weaknesses,
                use_cases: o.use_cases,
                popularity: o.popularity.min(100),
                learning_curve: LevelTag::parse(&o.learning_curve),
                documentation_quality: QualityTag::parse(&o.documentation_quality),
                integration_complexity: LevelTag::parse(&o.integration_complexity),
                sources: o.sources,
            })
            .collect();

        Ok(ResearchResult {
            category: gap.category,
            options,
            summary: parsed.summary,
            recommendation: None,
            from_catalogue: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tra_core::gap::model::GapPriority;
    use tra_gateway::testing::{FailingSearch, ScriptedLlm, ScriptedSearch};

    fn gap(category: TechCategory) -> TechGap {
        TechGap {
            category,
            description: "no choice recorded".to_string(),
            priority: GapPriority::High,
            impact: String::new(),
            candidate_hints: Vec::new(),
        }
    }

    fn context() -> ResearchContext {
        ResearchContext::from_inputs("A web product.", Vec::new())
    }

    const RESEARCH_JSON: &str = r#"{"options": [
        {"name": "PostgreSQL", "description": "relational", "popularity": 95,
         "learning_curve": "medium", "documentation_quality": "excellent", "integration_complexity": "medium"},
        {"name": "MongoDB", "description": "document", "popularity": 80,
         "learning_curve": "low", "documentation_quality": "good", "integration_complexity": "low"}
    ], "summary": "Two solid options."}"#;

    fn researcher(llm: ScriptedLlm, search: Arc<dyn SearchGateway>) -> TechnologyResearcher {
        TechnologyResearcher::new(
            Arc::new(llm),
            search,
            Cache::memory(),
            LlmConfig::default(),
            SearchConfig::default(),
            CacheConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_research_parses_and_ranks() {
        let researcher = researcher(
            ScriptedLlm::new().respond("Recommend technology options", RESEARCH_JSON),
            Arc::new(ScriptedSearch::canned()),
        );
        let outcome = researcher.research(&gap(TechCategory::Database), &context()).await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.result.options.len(), 2);
        assert_eq!(outcome.result.options[0].name, "PostgreSQL");
        assert_eq!(outcome.result.recommendation.as_deref(), Some("PostgreSQL"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_gateways() {
        let llm = ScriptedLlm::new().respond("Recommend technology options", RESEARCH_JSON);
        let researcher = researcher(llm, Arc::new(ScriptedSearch::canned()));
        let g = gap(TechCategory::Database);
        let ctx = context();

        let first = researcher.research(&g, &ctx).await;
        let second = researcher.research(&g, &ctx).await;
        let first_json = serde_json::to_string(&first.result).unwrap();
        let second_json = serde_json::to_string(&second.result).unwrap();
        assert_eq!(first_json, second_json);
        assert_eq!(researcher.cache.metrics().hits(), 1);
    }

    #[tokio::test]
    async fn test_search_outage_falls_back_to_catalogue() {
        let researcher = researcher(ScriptedLlm::new(), Arc::new(FailingSearch));
        let outcome = researcher.research(&gap(TechCategory::Caching), &context()).await;
        assert!(outcome.result.from_catalogue);
        assert!(!outcome.result.options.is_empty());
        let error = outcome.error.unwrap();
        assert_eq!(error.kind, ErrorKind::SearchFailed);
    }

    #[tokio::test]
    async fn test_unresearched_gap_without_catalogue() {
        let researcher = researcher(ScriptedLlm::new(), Arc::new(FailingSearch));
        let outcome = researcher.research(&gap(TechCategory::Analytics), &context()).await;
        assert!(outcome.result.options.is_empty());
        assert!(outcome.result.summary.contains("Research unavailable"));
        assert!(outcome.error.is_some());
    }
}
