//! ============================================================================
//! Price Lookup Tool
//! ============================================================================
//! Resolves a product by id or by fuzzy name and reports the price the
//! customer will actually pay (sale price when one is active).
//! ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::registry::{Tool, ToolOutput};
use crate::types::{AssistError, AssistResult, TenantContext, TenantId};

/// Maximum candidates returned for a name lookup
pub const MAX_PRICE_CANDIDATES: usize = 5;

/// Product as seen by the catalog collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    pub currency: String,
    #[serde(default)]
    pub in_stock: Option<bool>,
}

impl Product {
    /// Sale price when present and positive, list price otherwise
    pub fn effective_price(&self) -> f64 {
        match self.sale_price {
            Some(sale) if sale > 0.0 => sale,
            _ => self.price,
        }
    }

    pub fn on_sale(&self) -> bool {
        matches!(self.sale_price, Some(sale) if sale > 0.0)
    }
}

/// Tenant-scoped read access to the product catalog
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_by_id(&self, tenant: &TenantId, product_id: &str) -> AssistResult<Option<Product>>;

    /// Case-insensitive name search, at most `limit` products.
    /// Matches are ranked with [`rank_by_name`] before the limit is applied.
    async fn search_by_name(
        &self,
        tenant: &TenantId,
        name: &str,
        limit: usize,
    ) -> AssistResult<Vec<Product>>;
}

#[derive(Debug, Deserialize)]
struct PriceArgs {
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
}

/// `get_product_price`
pub struct PriceLookupTool {
    catalog: Arc<dyn ProductCatalog>,
}

impl PriceLookupTool {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { catalog }
    }
}

fn price_json(product: &Product) -> Value {
    json!({
        "product_id": product.id,
        "name": product.name,
        "price": product.effective_price(),
        "list_price": product.price,
        "on_sale": product.on_sale(),
        "currency": product.currency,
        "in_stock": product.in_stock,
    })
}

/// Order products for a name query: exact name, then prefix, then the rest.
/// The sort is stable, so catalog order breaks ties.
pub fn rank_by_name(products: &mut [Product], query: &str) {
    let needle = query.trim().to_lowercase();
    products.sort_by_key(|p| {
        let name = p.name.to_lowercase();
        if name == needle {
            0
        } else if name.starts_with(&needle) {
            1
        } else {
            2
        }
    });
}

fn rank_candidates(mut products: Vec<Product>, query: &str) -> Vec<Product> {
    rank_by_name(&mut products, query);
    products.truncate(MAX_PRICE_CANDIDATES);
    products
}

#[async_trait]
impl Tool for PriceLookupTool {
    fn name(&self) -> &str {
        "get_product_price"
    }

    fn description(&self) -> &str {
        "Look up the current price of a product by id or by (partial) name. \
         Returns the sale price when one is active."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product_id": {"type": "string", "description": "Exact product id"},
                "product_name": {"type": "string", "description": "Full or partial product name"}
            },
            "anyOf": [
                {"required": ["product_id"]},
                {"required": ["product_name"]}
            ]
        })
    }

    fn idempotent(&self) -> bool {
        true
    }

    async fn execute(&self, args: &Value, ctx: &TenantContext) -> AssistResult<ToolOutput> {
        let args: PriceArgs = serde_json::from_value(args.clone())
            .map_err(|e| AssistError::InvalidArguments(e.to_string()))?;

        let product_id = args.product_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let product_name = args.product_name.as_deref().map(str::trim).filter(|s| !s.is_empty());

        if let Some(id) = product_id {
            debug!(tenant = %ctx.tenant, product_id = id, "Price lookup by id");
            return Ok(match self.catalog.find_by_id(&ctx.tenant, id).await? {
                Some(product) => {
                    let message = format!(
                        "{} costs {:.2} {}",
                        product.name,
                        product.effective_price(),
                        product.currency
                    );
                    ToolOutput::new(json!({"found": true, "products": [price_json(&product)]}), message)
                }
                None => ToolOutput::new(
                    json!({"found": false, "products": []}),
                    format!("No product with id {}", id),
                ),
            });
        }

        let name = product_name.ok_or_else(|| {
            AssistError::InvalidArguments("either product_id or product_name is required".into())
        })?;

        debug!(tenant = %ctx.tenant, product_name = name, "Price lookup by name");
        let candidates = self
            .catalog
            .search_by_name(&ctx.tenant, name, MAX_PRICE_CANDIDATES)
            .await?;
        let candidates = rank_candidates(candidates, name);

        let message = match candidates.len() {
            0 => format!("No product matching '{}'", name),
            1 => format!(
                "{} costs {:.2} {}",
                candidates[0].name,
                candidates[0].effective_price(),
                candidates[0].currency
            ),
            n => format!("{} products match '{}'", n, name),
        };
        let products: Vec<Value> = candidates.iter().map(price_json).collect();

        Ok(ToolOutput::new(
            json!({"found": !products.is_empty(), "products": products}),
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCatalog {
        tenant: TenantId,
        products: Vec<Product>,
    }

    #[async_trait]
    impl ProductCatalog for FixedCatalog {
        async fn find_by_id(&self, tenant: &TenantId, product_id: &str) -> AssistResult<Option<Product>> {
            if tenant != &self.tenant {
                return Ok(None);
            }
            Ok(self.products.iter().find(|p| p.id == product_id).cloned())
        }

        async fn search_by_name(
            &self,
            tenant: &TenantId,
            name: &str,
            limit: usize,
        ) -> AssistResult<Vec<Product>> {
            if tenant != &self.tenant {
                return Ok(vec![]);
            }
            let needle = name.to_lowercase();
            let mut found: Vec<Product> = self
                .products
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            rank_by_name(&mut found, name);
            found.truncate(limit);
            Ok(found)
        }
    }

    fn product(id: &str, name: &str, price: f64, sale: Option<f64>) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            price,
            sale_price: sale,
            currency: "EGP".to_string(),
            in_stock: Some(true),
        }
    }

    fn tool() -> PriceLookupTool {
        let mut products = vec![
            product("1", "Classic Shirt", 300.0, Some(250.0)),
            product("2", "Shirt", 200.0, None),
            product("3", "Shirt Dress", 500.0, Some(0.0)),
        ];
        for i in 4..10 {
            products.push(product(&i.to_string(), &format!("Linen Shirt {}", i), 100.0, None));
        }
        PriceLookupTool::new(Arc::new(FixedCatalog {
            tenant: TenantId::new("shop-1").unwrap(),
            products,
        }))
    }

    fn ctx(tenant: &str) -> TenantContext {
        TenantContext::new(TenantId::new(tenant).unwrap())
    }

    #[test]
    fn test_effective_price_prefers_sale() {
        assert_eq!(product("1", "a", 300.0, Some(250.0)).effective_price(), 250.0);
        assert_eq!(product("1", "a", 300.0, None).effective_price(), 300.0);
        assert_eq!(product("1", "a", 300.0, Some(0.0)).effective_price(), 300.0);
    }

    #[tokio::test]
    async fn test_lookup_by_id_uses_sale_price() {
        let out = tool().execute(&json!({"product_id": "1"}), &ctx("shop-1")).await.unwrap();
        assert_eq!(out.data["found"], json!(true));
        assert_eq!(out.data["products"][0]["price"], json!(250.0));
        assert_eq!(out.data["products"][0]["on_sale"], json!(true));
    }

    #[tokio::test]
    async fn test_lookup_by_name_caps_and_ranks_candidates() {
        let out = tool().execute(&json!({"product_name": "shirt"}), &ctx("shop-1")).await.unwrap();
        let products = out.data["products"].as_array().unwrap();
        assert!(products.len() <= MAX_PRICE_CANDIDATES);
        assert_eq!(products[0]["name"], json!("Shirt"));
        assert_eq!(products[1]["name"], json!("Shirt Dress"));
    }

    #[test]
    fn test_rank_by_name_keeps_catalog_order_for_ties() {
        let mut products = vec![
            product("a", "Linen Shirt", 1.0, None),
            product("b", "Shirt Dress", 1.0, None),
            product("c", "Blue Shirt", 1.0, None),
            product("d", "SHIRT", 1.0, None),
        ];
        rank_by_name(&mut products, " shirt ");
        let ids: Vec<_> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_other_tenant_sees_nothing() {
        let out = tool().execute(&json!({"product_id": "1"}), &ctx("shop-2")).await.unwrap();
        assert_eq!(out.data["found"], json!(false));
    }

    #[tokio::test]
    async fn test_missing_arguments_rejected() {
        let err = tool().execute(&json!({}), &ctx("shop-1")).await.unwrap_err();
        assert!(matches!(err, AssistError::InvalidArguments(_)));
    }
}
