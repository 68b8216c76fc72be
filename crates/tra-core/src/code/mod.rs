//! Shared models for code parsing and API inference.
//!
//! The extraction logic lives in `tra-parser`; the types live here so the
//! session record can embed them without a dependency cycle.

pub mod model;
