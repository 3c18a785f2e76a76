// ============================================================================
// AssistDb - Embedded Database (redb)
// ============================================================================
// Local store for knowledge items, products, shipping tables, the append-only
// outcome log and alerts. Every key starts with the tenant id.
// Default path: ~/.assist/assist.redb (override via ASSIST_DB_PATH env var)
// ============================================================================

pub mod types;

pub use types::{AlertRecord, DbStats};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition, TableHandle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::{AlertSink, OutcomeRecord, OutcomeStore};
use crate::retrieval::{KnowledgeCorpus, KnowledgeItem};
use crate::tools::{
    rank_by_name, FlatRateTable, Product, ProductCatalog, ShippingRate, ShippingRates,
};
use crate::types::{AssistError, AssistResult, TenantId};

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

// Table definitions
const KNOWLEDGE: Table = TableDefinition::new("knowledge");
const PRODUCTS: Table = TableDefinition::new("products");
const SHIPPING: Table = TableDefinition::new("shipping");
const OUTCOMES: Table = TableDefinition::new("outcomes");
const ALERTS: Table = TableDefinition::new("alerts");

/// Key separator; tenant ids cannot contain control characters
const SEP: char = '\u{1f}';

fn tenant_prefix(tenant: &TenantId) -> String {
    format!("{}{}", tenant, SEP)
}

/// Exclusive upper bound for every key under `tenant_prefix`
fn tenant_end(tenant: &TenantId) -> String {
    format!("{}\u{20}", tenant)
}

/// Row ids share the key space with the separator, so they get the same
/// control-character check as tenant ids
fn row_key(tenant: &TenantId, id: &str) -> AssistResult<String> {
    if id.is_empty() || id.chars().any(char::is_control) {
        return Err(AssistError::InvalidArguments(format!(
            "row id {:?} is empty or contains control characters",
            id
        )));
    }
    Ok(format!("{}{}", tenant_prefix(tenant), id))
}

/// Time-ordered key for log tables
fn log_key(tenant: &TenantId, timestamp: i64, id: &Uuid) -> String {
    format!("{}{:020}{}{}", tenant_prefix(tenant), timestamp.max(0), SEP, id)
}

fn encode<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| anyhow!("Failed to serialize {}: {}", what, e))
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| anyhow!("Failed to deserialize {}: {}", what, e))
}

/// Embedded database for the support assistant
pub struct AssistDb {
    db: Database,
    path: PathBuf,
}

impl AssistDb {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses ASSIST_DB_PATH env var or ~/.assist/assist.redb
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var("ASSIST_DB_PATH") {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
            let assist_dir = home.join(".assist");
            std::fs::create_dir_all(&assist_dir)
                .map_err(|e| anyhow!("Failed to create .assist directory: {}", e))?;
            assist_dir.join("assist.redb")
        };

        info!("Opening database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| anyhow!("Failed to open database: {}", e))?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        for table in [KNOWLEDGE, PRODUCTS, SHIPPING, OUTCOMES, ALERTS] {
            let _ = write_txn
                .open_table(table)
                .map_err(|e| anyhow!("Failed to create {} table: {}", table.name(), e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        info!("Database ready");

        Ok(Self { db, path: db_path })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // Generic row helpers
    // ========================================================================

    fn put_row(&self, table: Table, key: &str, value: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut t = write_txn.open_table(table)
                .map_err(|e| anyhow!("Failed to open {} table: {}", table.name(), e))?;
            t.insert(key, value)
                .map_err(|e| anyhow!("Failed to insert into {}: {}", table.name(), e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;
        Ok(())
    }

    /// Insert only if the key is new; an existing row is never overwritten
    fn append_row(&self, table: Table, key: &str, value: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut t = write_txn.open_table(table)
                .map_err(|e| anyhow!("Failed to open {} table: {}", table.name(), e))?;
            let exists = t.get(key)
                .map_err(|e| anyhow!("Failed to read {}: {}", table.name(), e))?
                .is_some();
            if exists {
                // Dropping the transaction aborts it
                return Err(anyhow!("Refusing to overwrite {} row {}", table.name(), key));
            }
            t.insert(key, value)
                .map_err(|e| anyhow!("Failed to insert into {}: {}", table.name(), e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;
        Ok(())
    }

    fn get_row<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let t = read_txn.open_table(table)
            .map_err(|e| anyhow!("Failed to open {} table: {}", table.name(), e))?;

        match t.get(key).map_err(|e| anyhow!("Failed to get from {}: {}", table.name(), e))? {
            Some(value) => Ok(Some(decode(value.value(), table.name())?)),
            None => Ok(None),
        }
    }

    /// Decode every row with `start <= key < end`
    fn scan_rows<T: DeserializeOwned>(
        &self,
        table: Table,
        start: &str,
        end: &str,
    ) -> Result<Vec<T>> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let t = read_txn.open_table(table)
            .map_err(|e| anyhow!("Failed to open {} table: {}", table.name(), e))?;

        let mut results = Vec::new();
        let iter = t.range::<&str>(start..end)
            .map_err(|e| anyhow!("Failed to iterate {}: {}", table.name(), e))?;
        for entry in iter {
            let (_key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            results.push(decode(value.value(), table.name())?);
        }
        Ok(results)
    }

    fn scan_tenant<T: DeserializeOwned>(
        &self,
        table: Table,
        tenant: &TenantId,
    ) -> Result<Vec<T>> {
        self.scan_rows(table, &tenant_prefix(tenant), &tenant_end(tenant))
    }

    /// Distinct tenants and row count of a table
    fn table_tenants(&self, table: Table) -> Result<(BTreeSet<String>, usize)> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let t = read_txn.open_table(table)
            .map_err(|e| anyhow!("Failed to open {} table: {}", table.name(), e))?;

        let mut tenants = BTreeSet::new();
        let mut rows = 0;
        for entry in t.iter().map_err(|e| anyhow!("Failed to iterate {}: {}", table.name(), e))? {
            let (key, _value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            if let Some((tenant, _)) = key.value().split_once(SEP) {
                tenants.insert(tenant.to_string());
            }
            rows += 1;
        }
        Ok((tenants, rows))
    }

    // ========================================================================
    // Knowledge Operations
    // ========================================================================

    pub fn put_item(&self, item: &KnowledgeItem) -> Result<()> {
        let value = encode(item, "knowledge item")?;
        self.put_row(KNOWLEDGE, &row_key(&item.tenant, &item.id)?, &value)?;
        debug!("Stored knowledge item {} for tenant {}", item.id, item.tenant);
        Ok(())
    }

    pub fn get_item(&self, tenant: &TenantId, id: &str) -> Result<Option<KnowledgeItem>> {
        self.get_row(KNOWLEDGE, &row_key(tenant, id)?)
    }

    pub fn list_items(&self, tenant: &TenantId) -> Result<Vec<KnowledgeItem>> {
        self.scan_tenant(KNOWLEDGE, tenant)
    }

    // ========================================================================
    // Catalog Operations
    // ========================================================================

    pub fn put_product(&self, tenant: &TenantId, product: &Product) -> Result<()> {
        let value = encode(product, "product")?;
        self.put_row(PRODUCTS, &row_key(tenant, &product.id)?, &value)?;
        debug!("Stored product {} for tenant {}", product.id, tenant);
        Ok(())
    }

    pub fn list_products(&self, tenant: &TenantId) -> Result<Vec<Product>> {
        self.scan_tenant(PRODUCTS, tenant)
    }

    pub fn put_shipping_table(&self, tenant: &TenantId, rates: &FlatRateTable) -> Result<()> {
        let value = encode(rates, "shipping table")?;
        self.put_row(SHIPPING, &row_key(tenant, "rates")?, &value)?;
        debug!("Stored shipping table for tenant {}", tenant);
        Ok(())
    }

    pub fn get_shipping_table(&self, tenant: &TenantId) -> Result<Option<FlatRateTable>> {
        self.get_row(SHIPPING, &row_key(tenant, "rates")?)
    }

    // ========================================================================
    // Outcome Log (append-only)
    // ========================================================================

    pub fn append_outcome(&self, record: &OutcomeRecord) -> Result<()> {
        let value = encode(record, "outcome")?;
        self.append_row(OUTCOMES, &log_key(&record.tenant, record.timestamp, &record.id), &value)?;
        debug!("Appended outcome {} for tenant {}", record.id, record.tenant);
        Ok(())
    }

    pub fn list_outcomes_since(&self, tenant: &TenantId, since: i64) -> Result<Vec<OutcomeRecord>> {
        let start = format!("{}{:020}", tenant_prefix(tenant), since.max(0));
        let records: Vec<OutcomeRecord> = self.scan_rows(OUTCOMES, &start, &tenant_end(tenant))?;
        Ok(records.into_iter().filter(|r| r.timestamp >= since).collect())
    }

    pub fn outcome_tenants(&self) -> Result<Vec<TenantId>> {
        let (tenants, _) = self.table_tenants(OUTCOMES)?;
        Ok(tenants
            .into_iter()
            .filter_map(|t| TenantId::new(t).ok())
            .collect())
    }

    // ========================================================================
    // Alerts
    // ========================================================================

    pub fn store_alert(&self, alert: &AlertRecord) -> Result<()> {
        let value = encode(alert, "alert")?;
        self.append_row(ALERTS, &log_key(&alert.tenant, alert.created_at, &alert.id), &value)?;
        info!("Stored alert for tenant {}: {}", alert.tenant, alert.title);
        Ok(())
    }

    pub fn list_alerts(&self, tenant: &TenantId) -> Result<Vec<AlertRecord>> {
        self.scan_tenant(ALERTS, tenant)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> Result<DbStats> {
        let mut tenants = BTreeSet::new();
        let mut stats = DbStats::default();

        let (t, n) = self.table_tenants(KNOWLEDGE)?;
        tenants.extend(t);
        stats.knowledge_items = n;
        let (t, n) = self.table_tenants(PRODUCTS)?;
        tenants.extend(t);
        stats.products = n;
        let (t, n) = self.table_tenants(SHIPPING)?;
        tenants.extend(t);
        stats.shipping_tables = n;
        let (t, n) = self.table_tenants(OUTCOMES)?;
        tenants.extend(t);
        stats.outcomes = n;
        let (_, n) = self.table_tenants(ALERTS)?;
        stats.alerts = n;

        stats.embedded_items = self.count_embedded()?;
        stats.tenants = tenants.len();
        Ok(stats)
    }

    fn count_embedded(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(KNOWLEDGE)
            .map_err(|e| anyhow!("Failed to open knowledge table: {}", e))?;

        let mut count = 0;
        for entry in table.iter().map_err(|e| anyhow!("Failed to iterate knowledge: {}", e))? {
            let (_key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let item: KnowledgeItem = decode(value.value(), "knowledge item")?;
            if item.has_usable_embedding() {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl KnowledgeCorpus for AssistDb {
    async fn active_items(&self, tenant: &TenantId) -> AssistResult<Vec<KnowledgeItem>> {
        Ok(self
            .list_items(tenant)?
            .into_iter()
            .filter(|item| item.active && &item.tenant == tenant)
            .collect())
    }

    async fn has_embeddings(&self) -> AssistResult<bool> {
        Ok(self.count_embedded()? > 0)
    }
}

#[async_trait]
impl ProductCatalog for AssistDb {
    async fn find_by_id(&self, tenant: &TenantId, product_id: &str) -> AssistResult<Option<Product>> {
        Ok(self.get_row(PRODUCTS, &row_key(tenant, product_id)?)?)
    }

    async fn search_by_name(
        &self,
        tenant: &TenantId,
        name: &str,
        limit: usize,
    ) -> AssistResult<Vec<Product>> {
        let tokens: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<Product> = self
            .list_products(tenant)?
            .into_iter()
            .filter(|p| {
                let product_name = p.name.to_lowercase();
                tokens.iter().all(|t| product_name.contains(t.as_str()))
            })
            .collect();
        rank_by_name(&mut matches, name);
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl ShippingRates for AssistDb {
    async fn shipping_for_product(
        &self,
        tenant: &TenantId,
        product_id: Option<&str>,
        location: Option<&str>,
    ) -> AssistResult<ShippingRate> {
        let table = self.get_shipping_table(tenant)?.ok_or_else(|| {
            AssistError::Configuration(format!("no shipping rates configured for {}", tenant))
        })?;
        table.shipping_for_product(tenant, product_id, location).await
    }
}

#[async_trait]
impl OutcomeStore for AssistDb {
    async fn tenants(&self) -> AssistResult<Vec<TenantId>> {
        Ok(self.outcome_tenants()?)
    }

    async fn outcomes_since(&self, tenant: &TenantId, since: i64) -> AssistResult<Vec<OutcomeRecord>> {
        Ok(self.list_outcomes_since(tenant, since)?)
    }

    async fn append(&self, record: OutcomeRecord) -> AssistResult<()> {
        Ok(self.append_outcome(&record)?)
    }
}

#[async_trait]
impl AlertSink for AssistDb {
    async fn create_alert(
        &self,
        tenant: &TenantId,
        title: &str,
        message: &str,
        metadata: Value,
    ) -> AssistResult<()> {
        let alert = AlertRecord {
            id: Uuid::new_v4(),
            tenant: tenant.clone(),
            title: title.to_string(),
            message: message.to_string(),
            metadata: metadata.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        };
        Ok(self.store_alert(&alert)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Outcome;
    use crate::config::DispatchConfig;
    use crate::retrieval::EMBEDDING_DIM;
    use crate::tools::retry::{classify_error, ErrorKind};
    use crate::tools::{PriceLookupTool, ShippingLookupTool, Tool, ToolRegistry};
    use crate::types::TenantContext;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn open_temp() -> (tempfile::TempDir, AssistDb) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assist.redb");
        let db = AssistDb::open(path.to_str()).unwrap();
        (dir, db)
    }

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.into(),
            name: name.into(),
            price: 250.0,
            sale_price: None,
            currency: "EGP".into(),
            in_stock: Some(true),
        }
    }

    #[tokio::test]
    async fn test_items_are_tenant_scoped() {
        let (_dir, db) = open_temp();
        let a = tenant("shop");
        // Prefix of "shop" must not leak into "shop-2"
        let b = tenant("shop-2");
        db.put_item(&KnowledgeItem::new(a.clone(), "1", "Red Shirt")).unwrap();
        db.put_item(&KnowledgeItem::new(b.clone(), "1", "Blue Shirt")).unwrap();
        let mut hidden = KnowledgeItem::new(a.clone(), "2", "Old Shirt");
        hidden.active = false;
        db.put_item(&hidden).unwrap();

        let items = db.active_items(&a).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Red Shirt");
        assert_eq!(db.active_items(&b).await.unwrap()[0].name, "Blue Shirt");
        assert!(!db.has_embeddings().await.unwrap());

        db.put_item(&KnowledgeItem::new(b, "3", "Hat").with_embedding(vec![0.5; EMBEDDING_DIM]))
            .unwrap();
        assert!(db.has_embeddings().await.unwrap());
    }

    #[tokio::test]
    async fn test_catalog_lookup() {
        let (_dir, db) = open_temp();
        let t = tenant("shop");
        db.put_product(&t, &product("p1", "Red Cotton Shirt")).unwrap();
        db.put_product(&t, &product("p2", "Blue Shirt")).unwrap();
        db.put_product(&tenant("other"), &product("p3", "Red Shirt")).unwrap();

        assert!(db.find_by_id(&t, "p1").await.unwrap().is_some());
        assert!(db.find_by_id(&t, "p3").await.unwrap().is_none());

        let found = db.search_by_name(&t, "red shirt", 5).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "p1");
    }

    #[tokio::test]
    async fn test_shipping_requires_configured_table() {
        let (_dir, db) = open_temp();
        let t = tenant("shop");
        let err = db.shipping_for_product(&t, None, Some("cairo")).await.unwrap_err();
        assert_eq!(err.code(), "configuration_error");
        assert_eq!(classify_error(&err), ErrorKind::Permanent);

        let rate = ShippingRate {
            cost: 40.0,
            currency: "EGP".into(),
            min_days: Some(1),
            max_days: Some(2),
            carrier: None,
            free_over: None,
        };
        db.put_shipping_table(&t, &FlatRateTable::new(rate.clone())).unwrap();
        assert_eq!(db.shipping_for_product(&t, None, Some("cairo")).await.unwrap(), rate);
    }

    struct CountingRates {
        db: AssistDb,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ShippingRates for CountingRates {
        async fn shipping_for_product(
            &self,
            tenant: &TenantId,
            product_id: Option<&str>,
            location: Option<&str>,
        ) -> AssistResult<ShippingRate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.db.shipping_for_product(tenant, product_id, location).await
        }
    }

    #[tokio::test]
    async fn test_missing_shipping_table_is_not_retried() {
        let (_dir, db) = open_temp();
        let rates = Arc::new(CountingRates {
            db,
            calls: AtomicUsize::new(0),
        });
        let mut registry = ToolRegistry::new(DispatchConfig {
            base_delay_ms: 1,
            ..DispatchConfig::default()
        });
        registry
            .register(Arc::new(ShippingLookupTool::new(rates.clone())))
            .unwrap();

        let ctx = TenantContext::new(tenant("shop"));
        let outcome = registry
            .invoke("get_shipping_info", &serde_json::json!({"location": "cairo"}), &ctx)
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("configuration_error"));
        assert_eq!(rates.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_crafted_ids_cannot_reach_other_tenant_rows() {
        let (_dir, db) = open_temp();
        let victim = tenant("shop");
        db.put_product(&victim, &product("x", "Victim Product")).unwrap();

        // Ids carrying the key separator are refused on write and on read
        assert!(db.put_product(&victim, &product("x\u{1f}secret", "Hidden")).is_err());
        assert!(db.put_item(&KnowledgeItem::new(victim.clone(), "", "Blank")).is_err());
        let err = db.find_by_id(&victim, "x\u{1f}secret").await.unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");

        // A tenant that embeds the separator never deserializes in the first place
        let ctx = serde_json::from_str::<TenantContext>(
            r#"{"tenant":"shop\u001fx","caller_id":null,"conversation_id":null}"#,
        );
        assert!(ctx.is_err());

        assert!(db.find_by_id(&tenant("shop-x"), "x").await.unwrap().is_none());
        assert!(db.find_by_id(&victim, "x").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_name_search_ranks_before_limit() {
        let (_dir, db) = open_temp();
        let t = tenant("shop");
        for i in 0..6 {
            db.put_product(&t, &product(&format!("a{}", i), &format!("Linen Shirt {}", i)))
                .unwrap();
        }
        db.put_product(&t, &product("z9", "Shirt")).unwrap();

        let found = db.search_by_name(&t, "shirt", 5).await.unwrap();
        assert_eq!(found.len(), 5);
        assert_eq!(found[0].id, "z9");

        let tool = PriceLookupTool::new(Arc::new(db));
        let out = tool
            .execute(&serde_json::json!({"product_name": "shirt"}), &TenantContext::new(t))
            .await
            .unwrap();
        assert_eq!(out.data["products"][0]["name"], serde_json::json!("Shirt"));
        assert_eq!(out.data["products"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_outcome_log_is_append_only() {
        let (_dir, db) = open_temp();
        let t = tenant("shop");
        let now = chrono::Utc::now().timestamp();
        let old = OutcomeRecord::new(t.clone(), "refund", Outcome::Unsatisfied).at(now - 90_000);
        let recent = OutcomeRecord::new(t.clone(), "refund", Outcome::Satisfied).at(now - 60);

        db.append(old.clone()).await.unwrap();
        db.append(recent.clone()).await.unwrap();
        assert!(db.append(recent.clone()).await.is_err());

        let since = db.outcomes_since(&t, now - 86_400).await.unwrap();
        assert_eq!(since, vec![recent]);
        assert_eq!(db.tenants().await.unwrap(), vec![t]);
    }

    #[tokio::test]
    async fn test_alerts_and_stats() {
        let (_dir, db) = open_temp();
        let t = tenant("shop");
        db.put_item(&KnowledgeItem::new(t.clone(), "1", "Red Shirt")).unwrap();
        db.append(OutcomeRecord::new(t.clone(), "refund", Outcome::Satisfied)).await.unwrap();
        db.create_alert(&t, "Weak topics", "refund", serde_json::json!({"n": 1}))
            .await
            .unwrap();

        let alerts = db.list_alerts(&t).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metadata, r#"{"n":1}"#);

        let stats = db.stats().unwrap();
        assert_eq!(stats.tenants, 1);
        assert_eq!(stats.knowledge_items, 1);
        assert_eq!(stats.outcomes, 1);
        assert_eq!(stats.alerts, 1);
        assert_eq!(stats.embedded_items, 0);
    }
}
