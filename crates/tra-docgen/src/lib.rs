//! TRA Document Generation
//!
//! The five artifact generators (TRD, OpenAPI, SQL+ERD, architecture
//! diagram, tech-stack document) and the composite validator. Generators
//! share one shape: session context in, artifact text out, via the LLM
//! gateway. Only the TRD participates in the quality-gated regenerate loop.

pub mod error;
pub mod fallback;
pub mod generators;
pub mod util;
pub mod validator;

pub use error::{DocgenError, DocgenResult};
pub use generators::{DocumentGenerators, DocumentKind, TRD_SECTIONS};
pub use validator::{Validator, ValidatorOptions};
