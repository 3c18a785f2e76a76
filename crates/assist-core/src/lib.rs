//! ============================================================================
//! ASSIST-CORE: Decision support for the tenant support assistant
//! ============================================================================
//! This crate holds the AI-side logic behind customer conversations:
//! - Tool registry and dispatcher (price and shipping lookups)
//! - Tenant-scoped knowledge retrieval with a degrading fallback chain
//! - Tone analysis and reply adaptation (Egyptian Arabic + English)
//! - Nightly outcome analysis that flags weak support topics
//! - Embedded redb store implementing the collaborator contracts
//! ============================================================================

pub mod analysis;
pub mod assistant;
pub mod config;
pub mod db;
pub mod retrieval;
pub mod tone;
pub mod tools;
pub mod types;

// Re-export main types for convenience
pub use types::*;
pub use assistant::{Assistant, Collaborators};
pub use config::AssistConfig;
pub use db::AssistDb;
