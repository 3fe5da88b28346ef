//! wordsync-core - Core library for Wordsync
//!
//! Multi-device vocabulary sync: the SQLite store and its write gate, the
//! lineage-preserving merge engine, the batch orchestrator, and the read
//! projections and maintenance tasks shared by the API server and the CLI.

pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod sync;
pub mod util;

pub use config::{ConfigError, EditPolicy, EngineConfig, RetryPolicy};
pub use db::Database;
pub use error::{Error, Result};
pub use models::{WordId, WordMutation, WordRecord};
pub use sync::{SyncOrchestrator, SyncReport, SyncRequest};
