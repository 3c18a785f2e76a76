//! ============================================================================
//! Retrieval Module - Tenant-scoped knowledge search
//! ============================================================================
//! - EmbeddingService: model embeddings with SHA-256 pseudo-embedding fallback
//! - QdrantIndex: native nearest-neighbour backend
//! - KnowledgeSearch: native vector → brute-force cosine → keyword
//! ============================================================================

mod embeddings;
mod engine;
mod index;
pub mod similarity;
mod types;

pub use embeddings::{Embedding, EmbeddingProvider, EmbeddingService, HashEmbedder, HttpEmbeddingProvider};
pub use engine::{probe_strategy, KnowledgeSearch};
pub use index::{point_id, IndexHit, QdrantIndex, VectorIndex};
pub use types::{
    KnowledgeCorpus, KnowledgeItem, Provenance, SearchStrategy, SimilarityResult, EMBEDDING_DIM,
    KEYWORD_SCORE,
};
