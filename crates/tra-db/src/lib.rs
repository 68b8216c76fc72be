//! TRA Database Layer
//!
//! SQLite-based persistence for sessions, checkpoints, versioned output
//! artifacts, and the read-only upstream design-job table.

pub mod migrations;
pub mod queries;
pub mod store;

pub use migrations::run_migrations;
pub use store::{Database, StoreError, StoreResult};
