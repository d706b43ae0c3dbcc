//! OpenAI-compatible completion client.
//!
//! Works with any backend exposing a `/v1/chat/completions` endpoint
//! with function calling: OpenAI, OpenRouter, Ollama, vLLM, and friends.
//! The response is collapsed to the one distinction the orchestrator
//! consumes: did the model answer, or did it request tool calls.

use async_trait::async_trait;
use heatline_core::completion::{CompletionClient, CompletionRequest};
use heatline_core::error::CompletionError;
use heatline_core::tool::ToolSpec;
use heatline_core::turn::{ModelDecision, ToolRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs,
            client,
        }
    }

    /// Build from application config.
    pub fn from_config(config: &heatline_config::CompletionConfig) -> Self {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone().unwrap_or_default(),
            config.model.clone(),
            config.timeout_secs,
        )
    }

    /// Convert tool specs to the OpenAI function-calling format.
    fn to_api_tools(tools: &[ToolSpec]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.schema_json(),
                },
            })
            .collect()
    }

    /// Map the first choice of an API response to a decision.
    fn to_decision(response: ApiResponse) -> Result<ModelDecision, CompletionError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::MalformedResponse("response had no choices".into()))?;

        let message = choice.message;
        let content = message.content.unwrap_or_default();

        let tool_calls = message.tool_calls.unwrap_or_default();
        if tool_calls.is_empty() {
            if content.is_empty() {
                return Err(CompletionError::MalformedResponse(
                    "message had neither content nor tool calls".into(),
                ));
            }
            return Ok(ModelDecision::Direct { text: content });
        }

        let requests = tool_calls
            .into_iter()
            .map(|tc| ToolRequest {
                tool_name: tc.function.name,
                raw_arguments: tc.function.arguments,
            })
            .collect();

        Ok(ModelDecision::ToolRequests {
            preamble: if content.trim().is_empty() {
                None
            } else {
                Some(content)
            },
            requests,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<ModelDecision, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_directive },
                { "role": "user", "content": request.user_message },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_output_tokens,
        });

        if !request.tool_schemas.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tool_schemas));
        }

        debug!(model = %self.model, tools = request.tool_schemas.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(CompletionError::RateLimited { retry_after_secs: 5 });
        }

        if status == 401 || status == 403 {
            return Err(CompletionError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Completion backend returned error");
            return Err(CompletionError::Api {
                status_code: status,
                message: error_body.chars().take(200).collect(),
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        Self::to_decision(parsed)
    }
}

// --- Wire types (OpenAI chat-completions subset) ---

#[derive(Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,

    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    function: ApiCalledFunction,
}

#[derive(Deserialize)]
struct ApiCalledFunction {
    name: String,
    arguments: String,
}
