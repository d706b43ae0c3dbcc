//! Built-in tool implementations for Heatline.
//!
//! Tools are the side-effecting actions the model can request on the
//! customer's behalf: book an appointment, check parts inventory, log to
//! the CRM, send an SMS. Each module exposes a `spec()` plus a handler;
//! the registry pairs them at startup.

pub mod book_appointment;
pub mod crm_log;
pub mod inventory_lookup;
pub mod send_sms;

use heatline_core::error::ToolError;
use heatline_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Create the default tool registry with all built-in tools, in a fixed
/// registration order (the order their schemas reach the model).
pub fn default_registry(handler_timeout: Duration) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new(handler_timeout);
    registry.register(
        book_appointment::spec(),
        Arc::new(book_appointment::BookAppointmentTool),
    )?;
    registry.register(
        inventory_lookup::spec(),
        Arc::new(inventory_lookup::InventoryLookupTool),
    )?;
    registry.register(crm_log::spec(), Arc::new(crm_log::CrmLogTool))?;
    registry.register(send_sms::spec(), Arc::new(send_sms::SendSmsTool))?;
    Ok(registry)
}
