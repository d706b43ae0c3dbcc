//! CRM logging tool — stub that records a customer interaction note.
//!
//! In production this would write to the CRM system. The stub returns a
//! deterministic reference id derived from the note content.

use async_trait::async_trait;
use heatline_core::error::ToolError;
use heatline_core::tool::{ParamKind, ParamSpec, ToolHandler, ToolSpec};

pub struct CrmLogTool;

pub fn spec() -> ToolSpec {
    ToolSpec::new(
        "crm_log",
        "Log an interaction note against a customer record in the CRM.",
        vec![
            ParamSpec::required(
                "customer",
                ParamKind::String,
                "Customer name or account identifier",
            ),
            ParamSpec::required("note", ParamKind::String, "The note to record"),
        ],
    )
}

#[async_trait]
impl ToolHandler for CrmLogTool {
    async fn call(
        &self,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, ToolError> {
        let customer = arguments.get("customer").and_then(|v| v.as_str()).unwrap_or_default();
        let note = arguments.get("note").and_then(|v| v.as_str()).unwrap_or_default();

        if note.trim().is_empty() {
            return Err(ToolError::HandlerFailed {
                tool_name: "crm_log".into(),
                reason: "note must not be blank".into(),
            });
        }

        let hash: u32 = note
            .bytes()
            .chain(customer.bytes())
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

        tracing::info!(customer, "CRM note recorded");
        Ok(format!(
            "Logged note for {customer} to the CRM (ref CRM-{:06}).",
            hash % 1_000_000
        ))
    }
}
