//! ============================================================================
//! Vector Index - Native nearest-neighbour backend (Qdrant)
//! ============================================================================
//! Stores one point per knowledge item with the tenant id and active flag in
//! the payload. Every query carries a `tenant_id AND active` filter.
//! ============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{KnowledgeItem, EMBEDDING_DIM};
use crate::types::{AssistError, AssistResult, TenantId};

/// A raw hit from the native backend, before it is joined with the corpus
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub item_id: String,
    pub tenant: TenantId,
    /// Cosine similarity, i.e. `1 - cosine_distance`
    pub similarity: f32,
}

/// Native vector-similarity backend
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Startup probe
    async fn health_check(&self) -> bool;

    async fn upsert(&self, item: &KnowledgeItem) -> AssistResult<()>;

    /// Nearest active items of `tenant`, ascending cosine distance
    async fn nearest(&self, tenant: &TenantId, query: &[f32], k: usize)
        -> AssistResult<Vec<IndexHit>>;
}

/// Qdrant-backed index
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantIndex {
    /// Connect and make sure the collection exists
    pub async fn connect(url: &str, collection: &str) -> AssistResult<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url).build().map_err(|e| {
            AssistError::ProviderUnavailable(format!("failed to create Qdrant client: {}", e))
        })?;

        let index = Self {
            client,
            collection: collection.to_string(),
        };
        index.ensure_collection().await?;
        Ok(index)
    }

    async fn ensure_collection(&self) -> AssistResult<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| {
                AssistError::ProviderUnavailable(format!("failed to check collection: {}", e))
            })?;

        if exists {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        info!("Creating collection: {}", self.collection);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(EMBEDDING_DIM as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| {
                AssistError::ProviderUnavailable(format!("failed to create collection: {}", e))
            })?;
        Ok(())
    }
}

/// Deterministic point id; the tenant is part of the key so equal item ids in
/// different tenants never overwrite each other
pub fn point_id(tenant: &TenantId, item_id: &str) -> Uuid {
    let digest = Sha256::new()
        .chain_update(tenant.as_str().as_bytes())
        .chain_update([0u8])
        .chain_update(item_id.as_bytes())
        .finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn health_check(&self) -> bool {
        match self.client.health_check().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Qdrant health check failed: {}", e);
                false
            }
        }
    }

    async fn upsert(&self, item: &KnowledgeItem) -> AssistResult<()> {
        let embedding = item
            .embedding
            .as_ref()
            .filter(|e| e.len() == EMBEDDING_DIM)
            .ok_or_else(|| {
                AssistError::InvalidArguments(format!("item {} has no usable embedding", item.id))
            })?;

        let payload: HashMap<String, Value> = [
            ("tenant_id".to_string(), Value::from(item.tenant.as_str().to_string())),
            ("item_id".to_string(), Value::from(item.id.clone())),
            ("name".to_string(), Value::from(item.name.clone())),
            ("active".to_string(), Value::from(item.active)),
        ]
        .into_iter()
        .collect();

        let point = PointStruct::new(
            point_id(&item.tenant, &item.id).to_string(),
            embedding.clone(),
            payload,
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(|e| AssistError::ProviderUnavailable(format!("failed to upsert item: {}", e)))?;

        debug!("Indexed item {} for tenant {}", item.id, item.tenant);
        Ok(())
    }

    async fn nearest(
        &self,
        tenant: &TenantId,
        query: &[f32],
        k: usize,
    ) -> AssistResult<Vec<IndexHit>> {
        let filter = Filter::must([
            Condition::matches("tenant_id", tenant.as_str().to_string()),
            Condition::matches("active", true),
        ]);

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.to_vec(), k as u64)
                    .filter(filter)
                    .with_payload(true),
            )
            .await
            .map_err(|e| AssistError::ProviderUnavailable(format!("vector search failed: {}", e)))?;

        let hits: Vec<IndexHit> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let item_id = get_string(&point.payload, "item_id")?;
                let tenant = TenantId::new(get_string(&point.payload, "tenant_id")?).ok()?;
                Some(IndexHit {
                    item_id,
                    tenant,
                    similarity: point.score,
                })
            })
            .collect();

        debug!("Qdrant returned {} hits for tenant {}", hits.len(), tenant);
        Ok(hits)
    }
}

fn get_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
}
