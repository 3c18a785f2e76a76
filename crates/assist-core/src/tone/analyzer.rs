//! ============================================================================
//! Tone Analyzer - Register classification over recent customer messages
//! ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::profiles::{Tone, PROFILES};
use crate::config::ToneConfig;

/// Result of one classification. Recomputed per call, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneAnalysis {
    /// Effective register; neutral when confidence is below the cutoff
    pub dominant_tone: Tone,
    /// Highest-scoring category before the confidence gate
    pub nominal_tone: Option<Tone>,
    pub confidence: f64,
    pub scores: BTreeMap<Tone, u32>,
}

impl ToneAnalysis {
    fn neutral(scores: BTreeMap<Tone, u32>) -> Self {
        Self {
            dominant_tone: Tone::Neutral,
            nominal_tone: None,
            confidence: 0.0,
            scores,
        }
    }
}

pub struct ToneAnalyzer {
    config: ToneConfig,
}

impl Default for ToneAnalyzer {
    fn default() -> Self {
        Self::new(ToneConfig::default())
    }
}

impl ToneAnalyzer {
    pub fn new(config: ToneConfig) -> Self {
        Self { config }
    }

    /// Classify the last `window` messages (oldest first in `messages`)
    pub fn analyze_tone<S: AsRef<str>>(&self, messages: &[S]) -> ToneAnalysis {
        let start = messages.len().saturating_sub(self.config.window);
        let text = messages[start..]
            .iter()
            .map(|m| m.as_ref())
            .collect::<Vec<_>>()
            .join("\n");

        let scores: BTreeMap<Tone, u32> = PROFILES
            .iter()
            .map(|profile| (profile.tone, profile.score(&text)))
            .collect();

        // Profile order breaks ties
        let mut ranked: Vec<(Tone, u32)> = PROFILES
            .iter()
            .map(|profile| (profile.tone, scores.get(&profile.tone).copied().unwrap_or(0)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let (top_tone, top) = match ranked.first() {
            Some(&(tone, score)) if score > 0 => (tone, score),
            _ => return ToneAnalysis::neutral(scores),
        };
        let second = ranked.get(1).map(|&(_, s)| s).unwrap_or(0);
        let confidence = (top - second) as f64 / top as f64;

        let dominant_tone = if confidence < self.config.min_confidence {
            debug!(
                nominal = %top_tone,
                confidence,
                "Tone confidence below cutoff, using neutral register"
            );
            Tone::Neutral
        } else {
            top_tone
        };

        ToneAnalysis {
            dominant_tone,
            nominal_tone: Some(top_tone),
            confidence,
            scores,
        }
    }
}
