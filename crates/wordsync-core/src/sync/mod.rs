//! Lineage-preserving merge of device mutation batches.

mod lineage;
mod merge;
mod orchestrator;

pub use lineage::LineageResolver;
pub use merge::{MergeEngine, MergeOutcome};
pub use orchestrator::{ItemFailure, SyncOrchestrator, SyncReport, SyncRequest};
