//! ============================================================================
//! Tone Module - Customer register detection and reply adaptation
//! ============================================================================
//! - profiles: keyword + pattern lists per category (Arabic and English)
//! - ToneAnalyzer: scores the last N messages, gates on confidence
//! - adapter: phrase substitution and prompt style directives
//! ============================================================================

mod adapter;
mod analyzer;
mod profiles;

pub use adapter::{adapt, adapt_reply, style_directive, Adaptation};
pub use analyzer::{ToneAnalysis, ToneAnalyzer};
pub use profiles::{profile, Tone, ToneProfile, KEYWORD_WEIGHT, PATTERN_WEIGHT};
