//! TRA Cache Layer
//!
//! Keyed, TTL'd memoization of research, code parsing, and API inference.
//! Backed by Redis in production and an in-process map for tests. Cache
//! failures never fail the workflow; they degrade to always-miss.

pub mod client;
pub mod keys;
pub mod store;

pub use client::{init_pool, CacheError, CacheResult, RedisPool};
pub use keys::{api_inference_key, code_analysis_key, research_key, sha256_hex};
pub use store::{Cache, CacheMetrics};
