//! ============================================================================
//! Embedding Service - Vector embeddings for knowledge retrieval
//! ============================================================================
//! Generates text embeddings with an OpenAI-compatible API. When the model is
//! unreachable it derives a deterministic pseudo-embedding from a SHA-256 of
//! the normalized text so retrieval keeps working in degraded mode.
//! ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::types::EMBEDDING_DIM;
use crate::config::RetrievalConfig;
use crate::types::{AssistError, AssistResult};

/// Text → fixed-length vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> AssistResult<Vec<f32>>;

    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    model: String,
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct EmbeddingUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// OpenAI-compatible `/embeddings` client
pub struct HttpEmbeddingProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl HttpEmbeddingProvider {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Build from config; `None` when no API key is configured
    pub fn from_config(config: &RetrievalConfig) -> Option<Self> {
        let key = config.embedding_api_key.clone().filter(|k| !k.is_empty())?;
        Some(Self::new(
            key,
            config.embedding_base_url.clone(),
            config.embedding_model.clone(),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> AssistResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
            dimensions: EMBEDDING_DIM,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AssistError::ProviderUnavailable(format!("embedding request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AssistError::ProviderUnavailable(format!("failed to read embedding response: {}", e))
        })?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(AssistError::ProviderUnavailable(format!(
                    "embedding API error ({}): {}",
                    status, error.error.message
                )));
            }
            return Err(AssistError::ProviderUnavailable(format!(
                "embedding API error ({}): {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body).map_err(|e| {
            AssistError::ProviderUnavailable(format!("malformed embedding response: {}", e))
        })?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "Embedding tokens used: {} (model: {})",
                usage.total_tokens, parsed.model
            );
        }

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AssistError::ProviderUnavailable("no embedding returned".into()))?;

        if embedding.len() != EMBEDDING_DIM {
            return Err(AssistError::ProviderUnavailable(format!(
                "expected {} dimensions, model returned {}",
                EMBEDDING_DIM,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Deterministic, non-semantic embedding derived from SHA-256.
///
/// Identical normalized text always maps to the same unit vector, so exact
/// repeats still match; nothing else about the ranking is meaningful.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEmbedder;

impl HashEmbedder {
    /// Lower-case and collapse whitespace
    pub fn normalize(text: &str) -> String {
        text.split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let normalized = Self::normalize(text);
        let mut vector = Vec::with_capacity(EMBEDDING_DIM);
        let mut block: u32 = 0;

        // Counter-mode expansion: each block hashes (counter, text)
        while vector.len() < EMBEDDING_DIM {
            let mut hasher = Sha256::new();
            hasher.update(block.to_le_bytes());
            hasher.update(normalized.as_bytes());
            for byte in hasher.finalize() {
                if vector.len() == EMBEDDING_DIM {
                    break;
                }
                vector.push(byte as f32 / 127.5 - 1.0);
            }
            block += 1;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    /// Hex digest of the normalized text, usable as a stable cache key
    pub fn fingerprint(text: &str) -> String {
        hex::encode(Sha256::digest(Self::normalize(text).as_bytes()))
    }
}

/// An embedding plus whether it came from the hash fallback
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub degraded: bool,
}

/// Preferred model with hash fallback.
///
/// Without a configured model the service runs in degraded mode for every
/// call, which keeps query and item vectors comparable.
#[derive(Clone)]
pub struct EmbeddingService {
    primary: Option<Arc<dyn EmbeddingProvider>>,
    fallback: HashEmbedder,
}

impl EmbeddingService {
    pub fn new(primary: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            primary,
            fallback: HashEmbedder,
        }
    }

    /// Degraded-only service (no model configured)
    pub fn hash_only() -> Self {
        Self::new(None)
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        match HttpEmbeddingProvider::from_config(config) {
            Some(provider) => {
                debug!("Using {} at {} for embeddings", provider.model(), provider.base_url());
                Self::new(Some(Arc::new(provider)))
            }
            None => {
                warn!("No embedding API key configured, running retrieval in degraded mode");
                Self::hash_only()
            }
        }
    }

    /// No model is configured at all
    pub fn is_degraded_mode(&self) -> bool {
        self.primary.is_none()
    }

    /// Embed `text`; never fails, falls back to the hash embedder
    pub async fn embed(&self, text: &str) -> Embedding {
        if let Some(provider) = &self.primary {
            match provider.embed(text).await {
                Ok(vector) => {
                    return Embedding {
                        vector,
                        degraded: false,
                    }
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "Embedding provider failed, using hash fallback"
                    );
                }
            }
        }

        Embedding {
            vector: self.fallback.embed(text),
            degraded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::similarity::cosine_similarity;

    struct DownProvider;

    #[async_trait]
    impl EmbeddingProvider for DownProvider {
        async fn embed(&self, _text: &str) -> AssistResult<Vec<f32>> {
            Err(AssistError::ProviderUnavailable("connection refused".into()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    #[test]
    fn test_provider_from_config() {
        let mut config = RetrievalConfig::default();
        assert!(HttpEmbeddingProvider::from_config(&config).is_none());

        config.embedding_api_key = Some("test-key".into());
        config.embedding_base_url = "https://api.openai.com/v1/".into();
        let provider = HttpEmbeddingProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
        assert_eq!(provider.model(), "text-embedding-3-small");
    }

    #[test]
    fn test_hash_embedding_shape() {
        let v = HashEmbedder.embed("Red Shirt");
        assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "expected unit norm, got {}", norm);
    }

    #[test]
    fn test_hash_embedding_is_deterministic_over_normalization() {
        let a = HashEmbedder.embed("  Red   SHIRT ");
        let b = HashEmbedder.embed("red shirt");
        assert_eq!(a, b);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);

        let c = HashEmbedder.embed("blue shirt");
        assert!(cosine_similarity(&a, &c) < 0.5);
    }

    #[test]
    fn test_fingerprint_stable() {
        assert_eq!(
            HashEmbedder::fingerprint("Hello  World"),
            HashEmbedder::fingerprint("hello world")
        );
        assert_eq!(HashEmbedder::fingerprint("x").len(), 64);
    }

    #[tokio::test]
    async fn test_failing_provider_degrades() {
        let service = EmbeddingService::new(Some(Arc::new(DownProvider)));
        assert!(!service.is_degraded_mode());

        let embedding = service.embed("price of red shirt").await;
        assert!(embedding.degraded);
        assert_eq!(embedding.vector.len(), EMBEDDING_DIM);
    }

    #[tokio::test]
    async fn test_hash_only_service() {
        let service = EmbeddingService::hash_only();
        assert!(service.is_degraded_mode());
        assert!(service.embed("anything").await.degraded);
    }
}
