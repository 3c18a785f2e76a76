//! ============================================================================
//! Knowledge Search - Tenant-scoped retrieval with a degrading fallback chain
//! ============================================================================
//! Query → embed → native vector (if probed) → brute-force cosine → keyword.
//! Each tier is attempted automatically; exhaustion is an empty result, not
//! an error. Results are cached per (tenant, normalized query, k).
//! ============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::embeddings::{EmbeddingService, HashEmbedder};
use super::index::{IndexHit, VectorIndex};
use super::similarity::{brute_force_search, keyword_search, normalize_score};
use super::types::{
    KnowledgeCorpus, KnowledgeItem, Provenance, SearchStrategy, SimilarityResult,
};
use crate::config::RetrievalConfig;
use crate::types::{AssistError, AssistResult, TenantId};

/// Hash vectors only carry signal for (near-)exact repeats; anything below
/// this is noise and must not shadow the keyword tier
const DEGRADED_MIN_SCORE: f32 = 0.95;

/// Cached search results
#[derive(Debug, Clone)]
struct CachedResults {
    results: Vec<SimilarityResult>,
    cached_at: i64,
}

/// Short-lived result cache. Staleness is acceptable, retrieval is approximate.
struct SearchCache {
    entries: RwLock<HashMap<String, CachedResults>>,
    ttl_secs: i64,
    max_entries: usize,
}

impl SearchCache {
    fn new(ttl_secs: i64, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl_secs,
            max_entries,
        }
    }

    fn key(tenant: &TenantId, query: &str, k: usize) -> String {
        format!("{}\u{1f}{}\u{1f}{}", tenant, HashEmbedder::fingerprint(query), k)
    }

    async fn get(&self, key: &str) -> Option<Vec<SimilarityResult>> {
        if self.ttl_secs <= 0 {
            return None;
        }
        let now = chrono::Utc::now().timestamp();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|cached| now - cached.cached_at < self.ttl_secs)
            .map(|cached| cached.results.clone())
    }

    async fn insert(&self, key: String, results: Vec<SimilarityResult>) {
        if self.ttl_secs <= 0 || self.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.write().await;
        // Evict oldest entry if cache is at capacity
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, v)| v.cached_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }
        entries.insert(
            key,
            CachedResults {
                results,
                cached_at: chrono::Utc::now().timestamp(),
            },
        );
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Probe the available backends once at startup
pub async fn probe_strategy(
    corpus: &dyn KnowledgeCorpus,
    index: Option<&dyn VectorIndex>,
) -> SearchStrategy {
    if let Some(index) = index {
        if index.health_check().await {
            info!("Native vector backend available");
            return SearchStrategy::NativeVector;
        }
        warn!("Native vector backend configured but unhealthy");
    }

    match corpus.has_embeddings().await {
        Ok(true) => SearchStrategy::BruteForce,
        Ok(false) => SearchStrategy::KeywordOnly,
        Err(e) => {
            warn!("Corpus embedding probe failed: {} - using keyword search", e);
            SearchStrategy::KeywordOnly
        }
    }
}

/// Retrieval engine, constructed once at process start
pub struct KnowledgeSearch {
    corpus: Arc<dyn KnowledgeCorpus>,
    index: Option<Arc<dyn VectorIndex>>,
    embeddings: EmbeddingService,
    strategy: SearchStrategy,
    cache: SearchCache,
}

impl KnowledgeSearch {
    pub fn new(
        corpus: Arc<dyn KnowledgeCorpus>,
        index: Option<Arc<dyn VectorIndex>>,
        embeddings: EmbeddingService,
        strategy: SearchStrategy,
        config: &RetrievalConfig,
    ) -> Self {
        // A native strategy without a backend cannot be honoured
        let strategy = match (strategy, &index) {
            (SearchStrategy::NativeVector, None) => SearchStrategy::BruteForce,
            (s, _) => s,
        };
        info!("Knowledge search strategy: {}", strategy);

        Self {
            corpus,
            index,
            embeddings,
            strategy,
            cache: SearchCache::new(config.cache_ttl_secs, config.cache_max_entries),
        }
    }

    /// Probe the backends, then build the engine
    pub async fn start(
        corpus: Arc<dyn KnowledgeCorpus>,
        index: Option<Arc<dyn VectorIndex>>,
        embeddings: EmbeddingService,
        config: &RetrievalConfig,
    ) -> Self {
        let strategy = probe_strategy(corpus.as_ref(), index.as_deref()).await;
        Self::new(corpus, index, embeddings, strategy, config)
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Top-`k` items of `tenant` similar to `query`
    pub async fn search_knowledge(
        &self,
        query: &str,
        tenant: &TenantId,
        k: usize,
    ) -> AssistResult<Vec<SimilarityResult>> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let cache_key = SearchCache::key(tenant, query, k);
        if let Some(results) = self.cache.get(&cache_key).await {
            debug!(tenant = %tenant, "Search cache hit");
            return Ok(results);
        }

        let items = self.corpus.active_items(tenant).await?;
        let items = enforce_tenant(tenant, items);

        let mut results = Vec::new();
        if self.strategy != SearchStrategy::KeywordOnly {
            let embedding = self.embeddings.embed(query).await;
            // A hash vector is only comparable with hash-embedded items
            let comparable = !embedding.degraded || self.embeddings.is_degraded_mode();

            if comparable {
                results = self
                    .vector_tiers(tenant, &items, &embedding.vector, k, embedding.degraded)
                    .await;
            } else {
                debug!(tenant = %tenant, "Query embedding degraded, skipping vector tiers");
            }
        }

        if results.is_empty() {
            results = keyword_search(&items, query, k);
        }

        debug!(
            tenant = %tenant,
            strategy = %self.strategy,
            count = results.len(),
            "Knowledge search finished"
        );

        self.cache.insert(cache_key, results.clone()).await;
        Ok(results)
    }

    async fn vector_tiers(
        &self,
        tenant: &TenantId,
        items: &[KnowledgeItem],
        query: &[f32],
        k: usize,
        degraded: bool,
    ) -> Vec<SimilarityResult> {
        let mut results = self.nearest(tenant, items, query, k, degraded).await;
        if degraded {
            results.retain(|r| r.score >= DEGRADED_MIN_SCORE);
        }
        results
    }

    async fn nearest(
        &self,
        tenant: &TenantId,
        items: &[KnowledgeItem],
        query: &[f32],
        k: usize,
        degraded: bool,
    ) -> Vec<SimilarityResult> {
        if self.strategy == SearchStrategy::NativeVector {
            if let Some(index) = &self.index {
                match index.nearest(tenant, query, k).await {
                    Ok(hits) => return join_hits(tenant, items, hits, degraded),
                    Err(e) => {
                        warn!(tenant = %tenant, error = %e, "Native vector search failed, using brute force");
                    }
                }
            }
        }

        brute_force_search(items, query, k, degraded)
    }

    /// Embed an item if it has no vector yet and push it to the native index.
    /// Returns the item as it should be persisted.
    pub async fn index_item(&self, mut item: KnowledgeItem) -> AssistResult<KnowledgeItem> {
        if !item.has_usable_embedding() {
            let embedding = self.embeddings.embed(&item.embedding_text()).await;
            if embedding.degraded && !self.embeddings.is_degraded_mode() {
                // Do not mix hash vectors into a model-embedded corpus
                return Err(AssistError::ProviderUnavailable(format!(
                    "could not embed item {}",
                    item.id
                )));
            }
            item.embedding = Some(embedding.vector);
        }

        if let Some(index) = &self.index {
            index.upsert(&item).await?;
        }
        self.cache.clear().await;
        Ok(item)
    }
}

/// Drop anything a collaborator returned for another tenant
fn enforce_tenant(tenant: &TenantId, items: Vec<KnowledgeItem>) -> Vec<KnowledgeItem> {
    let before = items.len();
    let items: Vec<KnowledgeItem> = items
        .into_iter()
        .filter(|item| &item.tenant == tenant && item.active)
        .collect();
    if items.len() != before {
        error!(
            tenant = %tenant,
            dropped = before - items.len(),
            "Corpus returned foreign or inactive items"
        );
    }
    items
}

/// Join native hits with the tenant's active items; hits with no matching
/// item (other tenant, deactivated, deleted) are dropped
fn join_hits(
    tenant: &TenantId,
    items: &[KnowledgeItem],
    hits: Vec<IndexHit>,
    degraded: bool,
) -> Vec<SimilarityResult> {
    let by_id: HashMap<&str, &KnowledgeItem> =
        items.iter().map(|item| (item.id.as_str(), item)).collect();
    let mut seen = HashSet::new();

    hits.into_iter()
        .filter_map(|hit| {
            if &hit.tenant != tenant {
                error!(tenant = %tenant, other = %hit.tenant, "Vector backend returned a foreign hit");
                return None;
            }
            let item = by_id.get(hit.item_id.as_str())?;
            if !seen.insert(hit.item_id.clone()) {
                return None;
            }
            Some(SimilarityResult {
                item_id: item.id.clone(),
                name: item.name.clone(),
                score: normalize_score(hit.similarity),
                provenance: Provenance::NativeVector,
                degraded,
            })
        })
        .collect()
}
