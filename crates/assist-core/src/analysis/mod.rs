//! ============================================================================
//! Analysis Module - Self-diagnosis of weak support topics
//! ============================================================================
//! - types: outcome records (append-only), findings, store/alert contracts
//! - weakness: pure statistically gated tally
//! - PatternAnalyzer: per-tenant runs, batch with bounded parallelism,
//!   daily background scheduler
//! ============================================================================

mod engine;
mod types;
mod weakness;

pub use engine::{next_run_after, PatternAnalyzer, ALERT_TITLE};
pub use types::{
    intent_from_metadata, AlertSink, BatchReport, Outcome, OutcomeRecord, OutcomeStore,
    WeaknessFinding, UNKNOWN_INTENT,
};
pub use weakness::{find_weaknesses, format_alert};
