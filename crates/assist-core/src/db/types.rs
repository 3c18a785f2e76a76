//! ============================================================================
//! Database Types - Serializable records for redb storage
//! ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::TenantId;

/// Alert raised by the pattern analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub tenant: TenantId,
    pub title: String,
    pub message: String,
    /// JSON text (bincode cannot carry a dynamic value)
    pub metadata: String,
    pub created_at: i64,
}

/// Row counts for `assist stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbStats {
    pub tenants: usize,
    pub knowledge_items: usize,
    pub embedded_items: usize,
    pub products: usize,
    pub shipping_tables: usize,
    pub outcomes: usize,
    pub alerts: usize,
}
