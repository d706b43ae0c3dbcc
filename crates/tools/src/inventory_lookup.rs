//! Parts inventory lookup tool — stub that returns mock stock data.
//!
//! In production this would query the inventory system. The stub derives
//! deterministic but varied stock levels from the part name so dispatch
//! and aggregation can be tested without network access.

use async_trait::async_trait;
use heatline_core::error::ToolError;
use heatline_core::tool::{ParamKind, ParamSpec, ToolHandler, ToolSpec};

pub struct InventoryLookupTool;

pub fn spec() -> ToolSpec {
    ToolSpec::new(
        "inventory_lookup",
        "Check stock for a replacement part. Returns quantity on hand and which warehouse carries it.",
        vec![ParamSpec::required(
            "part",
            ParamKind::String,
            "Part name or number, e.g. 'igniter IGN-44'",
        )],
    )
}

#[async_trait]
impl ToolHandler for InventoryLookupTool {
    async fn call(
        &self,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, ToolError> {
        let part = arguments.get("part").and_then(|v| v.as_str()).unwrap_or_default();

        // Deterministic mock stock from the part name hash.
        let hash: u32 = part
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

        let quantity = hash % 12;
        let warehouses = ["North Depot", "Central Warehouse", "East Yard"];
        let warehouse = warehouses[(hash as usize / 7) % warehouses.len()];

        if quantity == 0 {
            Ok(format!(
                "{part} is out of stock; next restock expected within 5 business days."
            ))
        } else {
            Ok(format!("{part}: {quantity} in stock at {warehouse}."))
        }
    }
}
