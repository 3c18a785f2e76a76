//! ============================================================================
//! Shipping Lookup Tool
//! ============================================================================
//! Quotes shipping cost and delivery window for a product and/or destination
//! through the tenant's rate provider.
//! ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::registry::{Tool, ToolOutput};
use crate::types::{AssistError, AssistResult, TenantContext, TenantId};

/// Quote returned by the rate collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub cost: f64,
    pub currency: String,
    #[serde(default)]
    pub min_days: Option<u32>,
    #[serde(default)]
    pub max_days: Option<u32>,
    #[serde(default)]
    pub carrier: Option<String>,
    /// Order total above which shipping is free
    #[serde(default)]
    pub free_over: Option<f64>,
}

impl ShippingRate {
    /// Cost for an order of `order_total`; zero once the free threshold is met
    pub fn cost_for(&self, order_total: Option<f64>) -> f64 {
        match (self.free_over, order_total) {
            (Some(threshold), Some(total)) if total >= threshold => 0.0,
            _ => self.cost,
        }
    }
}

/// External shipping rate provider
#[async_trait]
pub trait ShippingRates: Send + Sync {
    async fn shipping_for_product(
        &self,
        tenant: &TenantId,
        product_id: Option<&str>,
        location: Option<&str>,
    ) -> AssistResult<ShippingRate>;
}

/// Per-destination flat rates with a default, for deployments without a
/// carrier integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatRateTable {
    pub default_rate: ShippingRate,
    /// Lower-cased destination → rate
    #[serde(default)]
    pub by_location: HashMap<String, ShippingRate>,
}

impl FlatRateTable {
    pub fn new(default_rate: ShippingRate) -> Self {
        Self {
            default_rate,
            by_location: HashMap::new(),
        }
    }

    pub fn with_location(mut self, location: &str, rate: ShippingRate) -> Self {
        self.by_location.insert(location.trim().to_lowercase(), rate);
        self
    }
}

#[async_trait]
impl ShippingRates for FlatRateTable {
    async fn shipping_for_product(
        &self,
        _tenant: &TenantId,
        _product_id: Option<&str>,
        location: Option<&str>,
    ) -> AssistResult<ShippingRate> {
        let rate = location
            .map(|l| l.trim().to_lowercase())
            .and_then(|l| self.by_location.get(&l))
            .unwrap_or(&self.default_rate);
        Ok(rate.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ShippingArgs {
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    order_total: Option<f64>,
}

/// `get_shipping_info`
pub struct ShippingLookupTool {
    rates: Arc<dyn ShippingRates>,
}

impl ShippingLookupTool {
    pub fn new(rates: Arc<dyn ShippingRates>) -> Self {
        Self { rates }
    }
}

#[async_trait]
impl Tool for ShippingLookupTool {
    fn name(&self) -> &str {
        "get_shipping_info"
    }

    fn description(&self) -> &str {
        "Get shipping cost and estimated delivery time for a product and/or a destination city."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product_id": {"type": "string", "description": "Product being shipped"},
                "location": {"type": "string", "description": "Destination city or governorate"},
                "order_total": {"type": "number", "description": "Cart total, for free-shipping thresholds"}
            },
            "anyOf": [
                {"required": ["product_id"]},
                {"required": ["location"]}
            ]
        })
    }

    fn idempotent(&self) -> bool {
        true
    }

    async fn execute(&self, args: &Value, ctx: &TenantContext) -> AssistResult<ToolOutput> {
        let args: ShippingArgs = serde_json::from_value(args.clone())
            .map_err(|e| AssistError::InvalidArguments(e.to_string()))?;

        let product_id = args.product_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let location = args.location.as_deref().map(str::trim).filter(|s| !s.is_empty());

        if product_id.is_none() && location.is_none() {
            return Err(AssistError::InvalidArguments(
                "either product_id or location is required".into(),
            ));
        }

        debug!(tenant = %ctx.tenant, ?product_id, ?location, "Shipping lookup");
        let rate = self
            .rates
            .shipping_for_product(&ctx.tenant, product_id, location)
            .await?;

        let cost = rate.cost_for(args.order_total);
        let window = match (rate.min_days, rate.max_days) {
            (Some(min), Some(max)) if min != max => format!(", {}-{} days", min, max),
            (Some(days), _) | (None, Some(days)) => format!(", {} days", days),
            (None, None) => String::new(),
        };
        let destination = location.map(|l| format!(" to {}", l)).unwrap_or_default();
        let message = if cost == 0.0 && rate.cost > 0.0 {
            format!("Shipping{} is free for this order{}", destination, window)
        } else {
            let threshold = rate
                .free_over
                .map(|t| format!(" (free over {:.2})", t))
                .unwrap_or_default();
            format!(
                "Shipping{} costs {:.2} {}{}{}",
                destination, cost, rate.currency, window, threshold
            )
        };

        Ok(ToolOutput::new(
            json!({
                "product_id": product_id,
                "location": location,
                "cost": cost,
                "free_shipping": cost == 0.0,
                "rate": rate,
            }),
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(cost: f64, min: u32, max: u32) -> ShippingRate {
        ShippingRate {
            cost,
            currency: "EGP".into(),
            min_days: Some(min),
            max_days: Some(max),
            carrier: None,
            free_over: None,
        }
    }

    fn tool() -> ShippingLookupTool {
        let table = FlatRateTable::new(rate(60.0, 3, 5)).with_location("Cairo", rate(40.0, 1, 2));
        ShippingLookupTool::new(Arc::new(table))
    }

    fn ctx() -> TenantContext {
        TenantContext::new(TenantId::new("shop-1").unwrap())
    }

    #[tokio::test]
    async fn test_location_specific_rate() {
        let out = tool().execute(&json!({"location": "cairo"}), &ctx()).await.unwrap();
        assert_eq!(out.data["rate"]["cost"], json!(40.0));
        assert_eq!(out.message, "Shipping to cairo costs 40.00 EGP, 1-2 days");
    }

    #[tokio::test]
    async fn test_default_rate_for_product_only() {
        let out = tool().execute(&json!({"product_id": "7"}), &ctx()).await.unwrap();
        assert_eq!(out.data["rate"]["cost"], json!(60.0));
    }

    #[tokio::test]
    async fn test_free_over_threshold() {
        let mut cairo = rate(40.0, 1, 2);
        cairo.free_over = Some(1000.0);
        let tool = ShippingLookupTool::new(Arc::new(FlatRateTable::new(cairo)));

        let out = tool
            .execute(&json!({"location": "Cairo", "order_total": 1200.0}), &ctx())
            .await
            .unwrap();
        assert_eq!(out.data["cost"], json!(0.0));
        assert_eq!(out.data["free_shipping"], json!(true));
        assert_eq!(out.message, "Shipping to Cairo is free for this order, 1-2 days");

        let out = tool
            .execute(&json!({"location": "Cairo", "order_total": 300.0}), &ctx())
            .await
            .unwrap();
        assert_eq!(out.data["cost"], json!(40.0));
        assert_eq!(
            out.message,
            "Shipping to Cairo costs 40.00 EGP, 1-2 days (free over 1000.00)"
        );
    }

    #[tokio::test]
    async fn test_requires_product_or_location() {
        let err = tool().execute(&json!({"location": "  "}), &ctx()).await.unwrap_err();
        assert!(matches!(err, AssistError::InvalidArguments(_)));
    }
}
