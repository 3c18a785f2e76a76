//! ============================================================================
//! Retrieval Types - Knowledge items, results and the corpus contract
//! ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{AssistResult, TenantId};

/// Fixed embedding dimensionality shared by every provider and backend
pub const EMBEDDING_DIM: usize = 768;

/// Fixed score for keyword-tier matches
pub const KEYWORD_SCORE: f32 = 0.5;

/// A searchable knowledge entry (product, FAQ answer, policy snippet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub tenant: TenantId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Absent until the item has been embedded
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl KnowledgeItem {
    pub fn new(tenant: TenantId, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant,
            name: name.into(),
            description: String::new(),
            embedding: None,
            active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Text used when embedding this item
    pub fn embedding_text(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{}\n{}", self.name, self.description)
        }
    }

    /// Has a vector of the expected dimensionality
    pub fn has_usable_embedding(&self) -> bool {
        self.embedding
            .as_ref()
            .map(|e| e.len() == EMBEDDING_DIM)
            .unwrap_or(false)
    }
}

/// Which retrieval tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    NativeVector,
    BruteForce,
    Keyword,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::NativeVector => write!(f, "native-vector"),
            Provenance::BruteForce => write!(f, "brute-force"),
            Provenance::Keyword => write!(f, "keyword"),
        }
    }
}

/// One ranked hit. Scores from every tier share the [0, 1] range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub item_id: String,
    pub name: String,
    pub score: f32,
    pub provenance: Provenance,
    /// Query vector came from the hash fallback; ranking is only meaningful
    /// for exact or near-exact repeats
    pub degraded: bool,
}

/// Retrieval backend resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStrategy {
    NativeVector,
    BruteForce,
    KeywordOnly,
}

impl std::fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Tenant-scoped read access to the knowledge corpus
#[async_trait]
pub trait KnowledgeCorpus: Send + Sync {
    /// Active items belonging to `tenant`, and only those
    async fn active_items(&self, tenant: &TenantId) -> AssistResult<Vec<KnowledgeItem>>;

    /// Whether any item in the corpus carries an embedding (startup probe)
    async fn has_embeddings(&self) -> AssistResult<bool>;
}
