//! TRA Workflow Engine
//!
//! The durable, checkpointed state machine that drives a session from input
//! analysis through research, human decisions, code analysis, document
//! generation, and persistence. Sessions suspend at the three
//! human-in-the-loop nodes and resume by event application; every node run
//! is an atomic state transition checkpointed on success.

pub mod api;
pub mod broadcast;
pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod persist;
pub mod researcher;

pub use api::{SessionOutputs, SessionStatus, StartRequest};
pub use broadcast::Broadcaster;
pub use checkpoint::CheckpointStore;
pub use engine::{Engine, EngineMetrics};
pub use error::{EngineError, EngineResult, NodeError};
pub use graph::{NodeId, Transition};
