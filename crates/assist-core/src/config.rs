//! ============================================================================
//! Assistant Configuration
//! ============================================================================
//! Tunables for dispatch, retrieval, tone and analysis. Every heuristic
//! threshold lives here so operators can change it without a rebuild.
//! ============================================================================

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{AssistError, AssistResult};

/// Top-level configuration, constructed once at process start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistConfig {
    pub dispatch: DispatchConfig,
    pub retrieval: RetrievalConfig,
    pub tone: ToneConfig,
    pub analysis: AnalysisConfig,
}

/// Tool dispatch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Per-call timeout
    pub call_timeout_ms: u64,
    /// Retries after the first attempt, idempotent transient failures only
    pub max_retries: u32,
    /// Base delay between retries (multiplied by 2^attempt)
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 5_000,
            max_retries: 2,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            jitter: true,
        }
    }
}

/// Knowledge retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Qdrant endpoint; `None` skips native vector probing
    pub qdrant_url: Option<String>,
    pub collection: String,
    pub embedding_base_url: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub default_k: usize,
    pub cache_ttl_secs: i64,
    pub cache_max_entries: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            qdrant_url: None,
            collection: "assist_knowledge".to_string(),
            embedding_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_api_key: None,
            default_k: 5,
            cache_ttl_secs: 60,
            cache_max_entries: 1_000,
        }
    }
}

/// Tone classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneConfig {
    /// Below this confidence the register is forced to neutral
    pub min_confidence: f64,
    /// Number of most recent customer messages considered
    pub window: usize,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.2,
            window: 5,
        }
    }
}

/// Nightly pattern analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum sample size per intent
    pub min_samples: u32,
    /// Failure rate must be strictly above this
    pub failure_rate_threshold: f64,
    pub window_hours: i64,
    /// UTC hour at which the daily run fires
    pub run_hour_utc: u32,
    /// Tenants analyzed concurrently
    pub max_parallel_tenants: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            failure_rate_threshold: 0.30,
            window_hours: 24,
            run_hour_utc: 3,
            max_parallel_tenants: 4,
        }
    }
}

impl AssistConfig {
    /// Build from defaults overridden by environment variables.
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.retrieval.qdrant_url = env_string("QDRANT_URL");
        config.retrieval.embedding_api_key = env_string("EMBEDDING_API_KEY");
        if let Some(url) = env_string("EMBEDDING_BASE_URL") {
            config.retrieval.embedding_base_url = url;
        }
        if let Some(model) = env_string("EMBEDDING_MODEL") {
            config.retrieval.embedding_model = model;
        }
        if let Some(collection) = env_string("ASSIST_COLLECTION") {
            config.retrieval.collection = collection;
        }
        env_parse("ASSIST_CACHE_TTL_SECS", &mut config.retrieval.cache_ttl_secs);
        env_parse("ASSIST_TOOL_TIMEOUT_MS", &mut config.dispatch.call_timeout_ms);
        env_parse("ASSIST_TOOL_MAX_RETRIES", &mut config.dispatch.max_retries);
        env_parse("ASSIST_TONE_MIN_CONFIDENCE", &mut config.tone.min_confidence);
        env_parse("ASSIST_MIN_SAMPLES", &mut config.analysis.min_samples);
        env_parse(
            "ASSIST_FAILURE_RATE_THRESHOLD",
            &mut config.analysis.failure_rate_threshold,
        );
        env_parse("ASSIST_RUN_HOUR_UTC", &mut config.analysis.run_hour_utc);
        env_parse("ASSIST_WINDOW_HOURS", &mut config.analysis.window_hours);
        env_parse(
            "ASSIST_MAX_PARALLEL_TENANTS",
            &mut config.analysis.max_parallel_tenants,
        );

        config
    }

    /// Reject values that would silently disable a component
    pub fn validate(&self) -> AssistResult<()> {
        if !(0.0..=1.0).contains(&self.tone.min_confidence) {
            return Err(AssistError::Configuration(format!(
                "tone.min_confidence must be within [0, 1], got {}",
                self.tone.min_confidence
            )));
        }
        if !(0.0..1.0).contains(&self.analysis.failure_rate_threshold) {
            return Err(AssistError::Configuration(format!(
                "analysis.failure_rate_threshold must be within [0, 1), got {}",
                self.analysis.failure_rate_threshold
            )));
        }
        if self.analysis.run_hour_utc > 23 {
            return Err(AssistError::Configuration(format!(
                "analysis.run_hour_utc must be 0-23, got {}",
                self.analysis.run_hour_utc
            )));
        }
        if self.dispatch.call_timeout_ms == 0 {
            return Err(AssistError::Configuration(
                "dispatch.call_timeout_ms must be positive".into(),
            ));
        }
        if self.analysis.max_parallel_tenants == 0 {
            return Err(AssistError::Configuration(
                "analysis.max_parallel_tenants must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Some(raw) = env_string(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring unparseable {}={}", key, raw),
        }
    }
}
