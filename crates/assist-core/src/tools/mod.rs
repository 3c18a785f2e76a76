//! ============================================================================
//! Tools Module - Capabilities callable by the reasoning layer
//! ============================================================================
//! - ToolRegistry: name → capability map, manifest projection, dispatch
//! - PriceLookupTool: product price by id or fuzzy name
//! - ShippingLookupTool: shipping cost and delivery window
//!
//! Built-in tools are read-only. Every call runs under a deadline, and only
//! idempotent tools are retried on transient failures.
//! ============================================================================

mod price;
mod registry;
pub mod retry;
mod shipping;

pub use price::{rank_by_name, PriceLookupTool, Product, ProductCatalog, MAX_PRICE_CANDIDATES};
pub use registry::{Tool, ToolCall, ToolDefinition, ToolOutcome, ToolOutput, ToolRegistry};
pub use shipping::{FlatRateTable, ShippingLookupTool, ShippingRate, ShippingRates};
