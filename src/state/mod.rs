//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `RunStage`: where a run currently is in the fetch-dedup-persist pipeline
//! - `ItemOutcome`: how a single listed entry ended up
//! - `RunSummary`: run-level counts aggregated from item outcomes

mod item_outcome;
mod run_stage;

// Re-export main types
pub use item_outcome::{ItemOutcome, ItemReport, RunSummary};
pub use run_stage::RunStage;
