//! SMS sending tool — stub that queues a text message.
//!
//! In production this would hand off to the SMS gateway. The stub
//! validates the destination number and confirms the queue.

use async_trait::async_trait;
use heatline_core::error::ToolError;
use heatline_core::tool::{ParamKind, ParamSpec, ToolHandler, ToolSpec};

pub struct SendSmsTool;

pub fn spec() -> ToolSpec {
    ToolSpec::new(
        "send_sms",
        "Send a text message to the customer, e.g. an appointment confirmation.",
        vec![
            ParamSpec::required(
                "phone",
                ParamKind::String,
                "Destination phone number, digits with optional punctuation",
            ),
            ParamSpec::required("message", ParamKind::String, "The message body"),
        ],
    )
}

#[async_trait]
impl ToolHandler for SendSmsTool {
    async fn call(
        &self,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, ToolError> {
        let phone = arguments.get("phone").and_then(|v| v.as_str()).unwrap_or_default();
        let message = arguments.get("message").and_then(|v| v.as_str()).unwrap_or_default();

        let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
        if digits < 10 {
            return Err(ToolError::HandlerFailed {
                tool_name: "send_sms".into(),
                reason: format!("'{phone}' is not a deliverable phone number"),
            });
        }
        if message.trim().is_empty() {
            return Err(ToolError::HandlerFailed {
                tool_name: "send_sms".into(),
                reason: "message body must not be blank".into(),
            });
        }

        tracing::info!(phone, chars = message.len(), "SMS queued");
        Ok(format!("SMS queued to {phone}."))
    }
}
