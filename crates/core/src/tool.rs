//! Tool declarations, validation, and dispatch.
//!
//! Tools are the side-effecting actions the model may request: book an
//! appointment, look up a part, log to the CRM, send an SMS. Each tool is
//! a declarative [`ToolSpec`] paired with a [`ToolHandler`]; the registry
//! maps names to both, so adding a tool is a registration call rather than
//! a new dispatch branch.
//!
//! Arguments arrive as raw JSON text from the model and are checked
//! against the spec before any handler runs. A missing or mistyped
//! required parameter is a validation failure, not an undefined-field
//! surprise inside the handler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ToolError;
use crate::turn::{InvocationOutcome, ToolInvocation};

/// The JSON type a tool parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    /// The JSON Schema type name for this kind.
    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Whether a JSON value conforms to this kind.
    fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }
}

/// The declarative schema of a tool: name, description, parameter shape.
/// Registered once at process start, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Vec<ParamSpec>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Render the JSON Schema object sent to the completion backend.
    pub fn schema_json(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.kind.schema_name(),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(serde_json::Value::String(param.name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// The executable side of a tool. Handlers are potentially external
/// network calls; the registry bounds them with a timeout.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with validated arguments. The returned text is the
    /// success payload folded into the aggregated answer.
    async fn call(
        &self,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<String, ToolError>;
}

struct RegisteredTool {
    spec: ToolSpec,
    handler: Arc<dyn ToolHandler>,
}

/// A registry of invocable tools: name → {spec, handler}.
///
/// Registration happens once at startup; during request handling the
/// registry is read-only, so concurrent turns share it without locking.
/// Registration order is preserved — schemas go into the completion
/// request in a deterministic order.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    handler_timeout: Duration,
}

impl ToolRegistry {
    pub fn new(handler_timeout: Duration) -> Self {
        Self {
            tools: Vec::new(),
            handler_timeout,
        }
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(
        &mut self,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    ) -> std::result::Result<(), ToolError> {
        if self.tools.iter().any(|t| t.spec.name == spec.name) {
            return Err(ToolError::Duplicate(spec.name));
        }
        self.tools.push(RegisteredTool { spec, handler });
        Ok(())
    }

    /// Declared schemas, in registration order.
    pub fn schemas(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec.clone()).collect()
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.spec.name == name)
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.spec.name.as_str()).collect()
    }

    /// Validate and execute one tool call.
    ///
    /// Pre-dispatch problems come back as `Err`: [`ToolError::Unknown`]
    /// for an unregistered name, [`ToolError::ArgumentParse`] for raw
    /// arguments that are not a JSON object, [`ToolError::Validation`]
    /// when a required parameter is missing or mistyped — the handler is
    /// never called in those cases. Once the handler runs, its failure or
    /// timeout is *not* an error: the invocation comes back `Ok` with a
    /// `Failure` outcome, to be folded into the aggregated answer.
    pub async fn invoke(
        &self,
        name: &str,
        raw_arguments: &str,
    ) -> std::result::Result<ToolInvocation, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.spec.name == name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))?;

        let arguments = Self::parse_arguments(raw_arguments)?;
        Self::validate(&tool.spec, &arguments)?;

        let started_at = chrono::Utc::now();
        let result = tokio::time::timeout(self.handler_timeout, tool.handler.call(&arguments)).await;
        let finished_at = chrono::Utc::now();

        let outcome = match result {
            Ok(Ok(payload)) => InvocationOutcome::Success(payload),
            Ok(Err(e)) => {
                tracing::warn!(tool = name, error = %e, "Tool handler failed");
                InvocationOutcome::Failure(e.to_string())
            }
            Err(_) => {
                let e = ToolError::Timeout {
                    tool_name: name.to_string(),
                    timeout_secs: self.handler_timeout.as_secs(),
                };
                tracing::warn!(tool = name, "Tool handler timed out");
                InvocationOutcome::Failure(e.to_string())
            }
        };

        Ok(ToolInvocation {
            tool_name: name.to_string(),
            arguments,
            outcome,
            started_at,
            finished_at,
        })
    }

    /// Parse raw model output into an argument map. An empty string is
    /// treated as an empty object; anything else must parse as one.
    fn parse_arguments(
        raw: &str,
    ) -> std::result::Result<serde_json::Map<String, serde_json::Value>, ToolError> {
        if raw.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| ToolError::ArgumentParse(e.to_string()))?;
        match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(ToolError::ArgumentParse(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// Check the argument map against the spec. Extra arguments the spec
    /// does not declare are ignored.
    fn validate(
        spec: &ToolSpec,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<(), ToolError> {
        for param in &spec.parameters {
            match arguments.get(&param.name) {
                None | Some(serde_json::Value::Null) => {
                    if param.required {
                        return Err(ToolError::Validation {
                            tool_name: spec.name.clone(),
                            reason: format!("missing required parameter '{}'", param.name),
                        });
                    }
                }
                Some(value) => {
                    if !param.kind.accepts(value) {
                        return Err(ToolError::Validation {
                            tool_name: spec.name.clone(),
                            reason: format!(
                                "parameter '{}' must be a {}",
                                param.name,
                                param.kind.schema_name()
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
