//! End-to-end integration tests for the Heatline backend.
//!
//! These tests exercise the full pipeline from HTTP request to final
//! answer: retrieval, model consultation, tool dispatch, aggregation,
//! and audit, with a scripted completion client standing in for the
//! language model.

use std::sync::Arc;
use std::time::Duration;

use heatline_audit::{InMemoryTurnLog, JsonlTurnLog};
use heatline_core::completion::{CompletionClient, CompletionRequest};
use heatline_core::error::CompletionError;
use heatline_core::turn::{ModelDecision, ToolRequest};
use heatline_orchestrator::{Persona, TurnOrchestrator};
use heatline_retrieval::KnowledgeBase;
use heatline_tools::default_registry;

// ── Scripted completion client ───────────────────────────────────────────

/// Returns scripted decisions in sequence; panics when exhausted.
struct ScriptedCompletion {
    decisions: std::sync::Mutex<Vec<ModelDecision>>,
    seen_directives: std::sync::Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    fn new(decisions: Vec<ModelDecision>) -> Self {
        Self {
            decisions: std::sync::Mutex::new(decisions),
            seen_directives: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn direct(text: &str) -> Self {
        Self::new(vec![ModelDecision::Direct { text: text.into() }])
    }

    fn requests(requests: Vec<(&str, &str)>) -> Self {
        Self::new(vec![ModelDecision::ToolRequests {
            preamble: None,
            requests: requests
                .into_iter()
                .map(|(name, args)| ToolRequest {
                    tool_name: name.into(),
                    raw_arguments: args.into(),
                })
                .collect(),
        }])
    }

    fn directives(&self) -> Vec<String> {
        self.seen_directives.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionClient for ScriptedCompletion {
    fn name(&self) -> &str {
        "e2e_scripted"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<ModelDecision, CompletionError> {
        self.seen_directives
            .lock()
            .unwrap()
            .push(request.system_directive.clone());

        let mut decisions = self.decisions.lock().unwrap();
        if decisions.is_empty() {
            panic!("ScriptedCompletion exhausted");
        }
        Ok(decisions.remove(0))
    }
}

fn orchestrator_with(
    completion: Arc<dyn CompletionClient>,
    logger: Arc<dyn heatline_core::audit::TurnLogger>,
) -> TurnOrchestrator {
    TurnOrchestrator::new(
        Arc::new(KnowledgeBase::hvac_starter(0.3, 5)),
        completion,
        Arc::new(default_registry(Duration::from_secs(5)).unwrap()),
        logger,
        Persona::default(),
    )
}

// ── E2E: Grounded answer ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_retrieval_grounds_the_model_consultation() {
    let completion = Arc::new(ScriptedCompletion::direct(
        "A clogged filter is the usual cause — swap it and see if the furnace recovers.",
    ));
    let orch = orchestrator_with(completion.clone(), Arc::new(InMemoryTurnLog::new()));

    let turn = orch.run("acme-hvac", "my furnace is not heating").await;

    assert_eq!(
        turn.final_answer,
        "A clogged filter is the usual cause — swap it and see if the furnace recovers."
    );
    assert!(!turn.retrieved_context.is_empty());

    // The directive the model saw must contain the retrieved knowledge.
    let directives = completion.directives();
    assert_eq!(directives.len(), 1);
    assert!(directives[0].contains("clogged filter"));
    assert!(directives[0].contains("Comfort Heating & Air"));
}

// ── E2E: Booking chain ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_booking_then_sms_reports_in_order() {
    let completion = Arc::new(ScriptedCompletion::requests(vec![
        (
            "book_appointment",
            r#"{"time": "2025-01-01T10:00", "details": "furnace repair"}"#,
        ),
        (
            "send_sms",
            r#"{"phone": "(555) 123-4567", "message": "Technician booked for Jan 1, 10am."}"#,
        ),
    ]));
    let logger = Arc::new(InMemoryTurnLog::new());
    let orch = orchestrator_with(completion, logger.clone());

    let turn = orch
        .run("acme-hvac", "book me for new year's morning and text me a confirmation")
        .await;

    let lines: Vec<&str> = turn.final_answer.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "book_appointment: Appointment booked for 2025-01-01T10:00.");
    assert_eq!(lines[1], "send_sms: SMS queued to (555) 123-4567.");

    assert_eq!(turn.tool_invocations.len(), 2);
    assert!(turn.tool_invocations.iter().all(|i| i.outcome.is_success()));
}

#[tokio::test]
async fn e2e_partial_tool_failure_degrades_one_line() {
    let completion = Arc::new(ScriptedCompletion::requests(vec![
        (
            "book_appointment",
            r#"{"time": "2025-01-01T10:00", "details": "furnace repair"}"#,
        ),
        // Undeliverable number: handler fails, booking line survives.
        ("send_sms", r#"{"phone": "911", "message": "confirmed"}"#),
    ]));
    let orch = orchestrator_with(completion, Arc::new(InMemoryTurnLog::new()));

    let turn = orch.run("acme-hvac", "book and text me").await;

    let lines: Vec<&str> = turn.final_answer.lines().collect();
    assert!(lines[0].contains("Appointment booked"));
    assert!(lines[1].starts_with("send_sms:"));
    assert!(!turn.tool_invocations[1].outcome.is_success());
    assert!(turn.tool_invocations[0].outcome.is_success());
}

// ── E2E: Degrade path with the real completion client ────────────────────

#[tokio::test]
async fn e2e_unreachable_backend_still_answers() {
    // A real OpenAI-compat client pointed at a dead endpoint: the
    // customer still gets the apology, not an error.
    let completion = Arc::new(heatline_completion::OpenAiCompatClient::new(
        "http://127.0.0.1:1/v1",
        "test-key",
        "gpt-4o-mini",
        2,
    ));
    let logger = Arc::new(InMemoryTurnLog::new());
    let orch = TurnOrchestrator::new(
        Arc::new(KnowledgeBase::hvac_starter(0.3, 5)),
        completion,
        Arc::new(default_registry(Duration::from_secs(5)).unwrap()),
        logger,
        Persona::default(),
    );

    let turn = orch.run("acme-hvac", "my furnace is not heating").await;
    assert!(turn.final_answer.contains("(555) 987-6643"));
    assert!(turn.tool_invocations.is_empty());
}

// ── E2E: Audit trail ─────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_jsonl_audit_records_the_whole_turn() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("turns.jsonl");
    let logger = Arc::new(JsonlTurnLog::new(path));

    let completion = Arc::new(ScriptedCompletion::requests(vec![(
        "crm_log",
        r#"{"customer": "J. Alvarez", "note": "Asked about filter sizes."}"#,
    )]));
    let orch = orchestrator_with(completion, logger.clone());

    let turn = orch.run("acme-hvac", "log that I asked about filters").await;

    // Logging is fire-and-forget; wait for the record to land.
    let mut recorded = Vec::new();
    for _ in 0..100 {
        recorded = logger.load();
        if !recorded.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].id, turn.id);
    assert_eq!(recorded[0].final_answer, turn.final_answer);
    assert_eq!(recorded[0].tool_invocations.len(), 1);
    assert_eq!(recorded[0].user_message, "log that I asked about filters");
}

// ── E2E: Gateway over the full stack ─────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_chat_roundtrip() {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let completion = Arc::new(ScriptedCompletion::direct("Check your filter first."));
    let orchestrator = Arc::new(orchestrator_with(completion, Arc::new(InMemoryTurnLog::new())));

    let state = Arc::new(heatline_gateway::GatewayState {
        orchestrator,
        bearer_tokens: Vec::new(),
        fallback_apology: heatline_config::AnswerConfig::default().fallback_apology,
    });
    let app = heatline_gateway::build_router(state, &[]);

    let req = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("Content-Type", "application/json")
        .body(Body::from(
            r#"{"message": "furnace not heating", "tenant_id": "acme-hvac"}"#,
        ))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), 200);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["content"], "Check your filter first.");
}

// ── E2E: Configuration wiring ────────────────────────────────────────────

#[tokio::test]
async fn e2e_default_config_builds_the_full_stack() {
    let config = heatline_config::AppConfig::default();
    assert!(config.validate().is_ok());

    // TOML roundtrip.
    let toml_str = toml::to_string_pretty(&config).expect("Config should serialize");
    let reparsed: heatline_config::AppConfig =
        toml::from_str(&toml_str).expect("Config should parse back");
    assert_eq!(reparsed.gateway.port, config.gateway.port);
    assert_eq!(reparsed.company.name, config.company.name);

    // Wiring from config succeeds.
    let state = heatline_gateway::build_state(&config).expect("Stack should build");
    assert!(state.bearer_tokens.is_empty());
}
