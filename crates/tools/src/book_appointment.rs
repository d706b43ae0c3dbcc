//! Appointment booking tool — stub that confirms a service slot.
//!
//! In production this would call the scheduling/calendar backend. The
//! stub validates the slot format and returns the confirmation line so
//! the dispatch loop can be tested end-to-end without network access.

use async_trait::async_trait;
use heatline_core::error::ToolError;
use heatline_core::tool::{ParamKind, ParamSpec, ToolHandler, ToolSpec};

/// The slot format the scheduling backend accepts.
const SLOT_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub struct BookAppointmentTool;

pub fn spec() -> ToolSpec {
    ToolSpec::new(
        "book_appointment",
        "Book a service appointment for the customer. Use when the customer agrees to schedule a visit.",
        vec![
            ParamSpec::required(
                "time",
                ParamKind::String,
                "Requested appointment slot, formatted YYYY-MM-DDTHH:MM",
            ),
            ParamSpec::required(
                "details",
                ParamKind::String,
                "Short description of the job, e.g. 'furnace repair'",
            ),
        ],
    )
}

#[async_trait]
impl ToolHandler for BookAppointmentTool {
    async fn call(
        &self,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, ToolError> {
        let time = arguments.get("time").and_then(|v| v.as_str()).unwrap_or_default();
        let details = arguments.get("details").and_then(|v| v.as_str()).unwrap_or_default();

        if chrono::NaiveDateTime::parse_from_str(time, SLOT_FORMAT).is_err() {
            return Err(ToolError::HandlerFailed {
                tool_name: "book_appointment".into(),
                reason: format!("'{time}' is not a valid slot (expected YYYY-MM-DDTHH:MM)"),
            });
        }

        tracing::info!(time, details, "Appointment booked");
        Ok(format!("Appointment booked for {time}."))
    }
}
