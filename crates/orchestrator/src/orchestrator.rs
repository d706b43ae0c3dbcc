//! The turn orchestrator — one user utterance in, one finalized Turn out.
//!
//! A turn moves through retrieval, model consultation, and (when the
//! model asks for it) tool dispatch, then aggregates a single answer.
//! Every step degrades instead of failing: a knowledge-base outage means
//! an empty context, a dead model means the fallback apology, a broken
//! tool means one failure line in the aggregated answer. No failure
//! below the transport boundary leaves a turn without a final answer.

use std::sync::Arc;
use std::time::Duration;

use heatline_core::audit::TurnLogger;
use heatline_core::completion::{CompletionClient, CompletionRequest};
use heatline_core::error::ToolError;
use heatline_core::retrieval::ContextProvider;
use heatline_core::tool::ToolRegistry;
use heatline_core::turn::{ContextSnippet, ModelDecision, ToolInvocation, ToolRequest, Turn};
use tracing::{debug, info, warn};

use crate::directive::{Persona, build_directive};

/// Orchestrates a single turn: retrieve context, consult the model,
/// dispatch requested tools, aggregate the answer, log the turn.
///
/// All collaborators are injected once at construction and shared
/// read-only across concurrent turns.
pub struct TurnOrchestrator {
    retriever: Arc<dyn ContextProvider>,
    completion: Arc<dyn CompletionClient>,
    tools: Arc<ToolRegistry>,
    logger: Arc<dyn TurnLogger>,
    persona: Persona,
    temperature: f32,
    max_output_tokens: u32,
    retrieval_timeout: Duration,
    completion_timeout: Duration,
    fallback_apology: String,
    solicitation: String,
}

impl TurnOrchestrator {
    pub fn new(
        retriever: Arc<dyn ContextProvider>,
        completion: Arc<dyn CompletionClient>,
        tools: Arc<ToolRegistry>,
        logger: Arc<dyn TurnLogger>,
        persona: Persona,
    ) -> Self {
        let defaults = heatline_config::AnswerConfig::default();
        Self {
            retriever,
            completion,
            tools,
            logger,
            persona,
            temperature: 0.3,
            max_output_tokens: 1024,
            retrieval_timeout: Duration::from_secs(5),
            completion_timeout: Duration::from_secs(30),
            fallback_apology: defaults.fallback_apology,
            solicitation: defaults.solicitation,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = max;
        self
    }

    pub fn with_retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.retrieval_timeout = timeout;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn with_fallback_apology(mut self, text: impl Into<String>) -> Self {
        self.fallback_apology = text.into();
        self
    }

    pub fn with_solicitation(mut self, text: impl Into<String>) -> Self {
        self.solicitation = text.into();
        self
    }

    /// Process one turn and return it finalized.
    ///
    /// `final_answer` on the returned turn is what the transport sends
    /// back; it is non-empty on every path.
    pub async fn run(&self, tenant_id: &str, user_message: &str) -> Turn {
        let mut turn = Turn::begin(tenant_id, user_message);
        info!(turn_id = %turn.id, tenant = tenant_id, "Processing turn");

        // An empty utterance gets the solicitation straight away — no
        // point spending a model call on it.
        if user_message.trim().is_empty() {
            debug!(turn_id = %turn.id, "Empty message, returning solicitation");
            return self.finish(turn, self.solicitation.clone());
        }

        // ── Retrieval (best-effort) ──
        turn.retrieved_context = self.retrieve_context(user_message).await;

        // ── Model consultation ──
        let request = CompletionRequest {
            system_directive: build_directive(&self.persona, &turn.retrieved_context),
            user_message: user_message.to_string(),
            tool_schemas: self.tools.schemas(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        };

        let decision = match tokio::time::timeout(
            self.completion_timeout,
            self.completion.complete(request),
        )
        .await
        {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                warn!(turn_id = %turn.id, error = %e, "Completion failed, using fallback answer");
                return self.finish(turn, self.fallback_apology.clone());
            }
            Err(_) => {
                warn!(
                    turn_id = %turn.id,
                    timeout_secs = self.completion_timeout.as_secs(),
                    "Completion timed out, using fallback answer"
                );
                return self.finish(turn, self.fallback_apology.clone());
            }
        };

        // ── Direct answer or tool dispatch ──
        match decision {
            ModelDecision::Direct { text } => {
                turn.model_answer = Some(text.clone());
                self.finish(turn, text)
            }
            ModelDecision::ToolRequests { preamble, requests } => {
                turn.model_answer = preamble.clone();
                let answer = self.dispatch(&mut turn, preamble, &requests).await;
                self.finish(turn, answer)
            }
        }
    }

    /// Retrieve ranked snippets, degrading to an empty context on any
    /// provider failure or timeout. A knowledge-base outage must not
    /// block answering.
    async fn retrieve_context(&self, query: &str) -> Vec<ContextSnippet> {
        match tokio::time::timeout(self.retrieval_timeout, self.retriever.retrieve(query)).await {
            Ok(Ok(snippets)) => {
                debug!(count = snippets.len(), "Context retrieved");
                snippets
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Retrieval failed, continuing with empty context");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.retrieval_timeout.as_secs(),
                    "Retrieval timed out, continuing with empty context"
                );
                Vec::new()
            }
        }
    }

    /// Execute requested tools in model order and aggregate the answer.
    ///
    /// Invocations run sequentially: the ordering of outcome lines is the
    /// externally observable guarantee, and executing in report order is
    /// the simplest way to also run side effects in that order. A failed
    /// call never aborts the remaining ones.
    async fn dispatch(
        &self,
        turn: &mut Turn,
        preamble: Option<String>,
        requests: &[ToolRequest],
    ) -> String {
        let preamble = preamble.filter(|p| !p.trim().is_empty());

        if requests.is_empty() {
            debug!(turn_id = %turn.id, "Decision carried no tool requests");
            return preamble.unwrap_or_else(|| self.fallback_apology.clone());
        }

        let mut lines: Vec<String> = Vec::with_capacity(requests.len() + 1);
        if let Some(p) = preamble {
            lines.push(p);
        }

        for request in requests {
            // A nameless request still gets a terminal record.
            let name = if request.tool_name.is_empty() {
                "unknown"
            } else {
                request.tool_name.as_str()
            };

            let invocation = match self.tools.invoke(name, &request.raw_arguments).await {
                Ok(invocation) => invocation,
                Err(e) => {
                    let reason = match &e {
                        ToolError::Unknown(_) => "unknown action".to_string(),
                        other => other.to_string(),
                    };
                    warn!(tool = name, error = %e, "Tool request rejected");
                    ToolInvocation::rejected(name, reason)
                }
            };

            lines.push(format!("{}: {}", invocation.tool_name, invocation.outcome.text()));
            turn.tool_invocations.push(invocation);
        }

        lines.join("\n")
    }

    /// Finalize the turn and hand a copy to the audit sink without
    /// waiting on it. A sink failure is recorded and never changes the
    /// answer already computed.
    fn finish(&self, turn: Turn, answer: String) -> Turn {
        let turn = turn.finalize(answer);
        debug_assert!(turn.invocations_terminal());

        let record = turn.clone();
        let logger = Arc::clone(&self.logger);
        tokio::spawn(async move {
            if let Err(e) = logger.record(record).await {
                warn!(error = %e, "Failed to record turn");
            }
        });

        info!(
            turn_id = %turn.id,
            invocations = turn.tool_invocations.len(),
            answer_len = turn.final_answer.len(),
            "Turn complete"
        );
        turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use heatline_core::error::{CompletionError, RetrievalError};
    use heatline_core::tool::{ParamKind, ParamSpec, ToolHandler, ToolSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};

    // --- Test doubles ---

    struct FixedRetriever {
        snippets: Vec<ContextSnippet>,
    }

    #[async_trait]
    impl ContextProvider for FixedRetriever {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn retrieve(&self, _query: &str) -> Result<Vec<ContextSnippet>, RetrievalError> {
            Ok(self.snippets.clone())
        }
    }

    struct BrokenRetriever;

    #[async_trait]
    impl ContextProvider for BrokenRetriever {
        fn name(&self) -> &str {
            "broken"
        }
        async fn retrieve(&self, _query: &str) -> Result<Vec<ContextSnippet>, RetrievalError> {
            Err(RetrievalError::Backend("index offline".into()))
        }
    }

    struct FixedCompletion {
        decision: ModelDecision,
        calls: Arc<AtomicUsize>,
    }

    impl FixedCompletion {
        fn direct(text: &str) -> Self {
            Self {
                decision: ModelDecision::Direct { text: text.into() },
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn requests(preamble: Option<&str>, requests: Vec<(&str, &str)>) -> Self {
            Self {
                decision: ModelDecision::ToolRequests {
                    preamble: preamble.map(String::from),
                    requests: requests
                        .into_iter()
                        .map(|(name, args)| ToolRequest {
                            tool_name: name.into(),
                            raw_arguments: args.into(),
                        })
                        .collect(),
                },
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for FixedCompletion {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<ModelDecision, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.decision.clone())
        }
    }

    struct BrokenCompletion;

    #[async_trait]
    impl CompletionClient for BrokenCompletion {
        fn name(&self) -> &str {
            "broken"
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<ModelDecision, CompletionError> {
            Err(CompletionError::Network("connection refused".into()))
        }
    }

    struct SlowCompletion;

    #[async_trait]
    impl CompletionClient for SlowCompletion {
        fn name(&self) -> &str {
            "slow"
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<ModelDecision, CompletionError> {
            tokio::time::sleep(Duration::from_secs(300)).await;
            Ok(ModelDecision::Direct { text: "too late".into() })
        }
    }

    /// Returns its configured payload; counts calls.
    struct StubHandler {
        payload: String,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolHandler for StubHandler {
        async fn call(
            &self,
            _arguments: &serde_json::Map<String, serde_json::Value>,
        ) -> Result<String, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    fn stub_registry(names: &[&str]) -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new(Duration::from_secs(5));
        for name in names {
            registry
                .register(
                    ToolSpec::new(*name, "stub", vec![]),
                    Arc::new(StubHandler {
                        payload: format!("{name} done"),
                        calls: calls.clone(),
                    }),
                )
                .unwrap();
        }
        (registry, calls)
    }

    fn orchestrator(
        retriever: Arc<dyn ContextProvider>,
        completion: Arc<dyn CompletionClient>,
        registry: ToolRegistry,
    ) -> (TurnOrchestrator, Arc<heatline_audit::InMemoryTurnLog>) {
        let logger = Arc::new(heatline_audit::InMemoryTurnLog::new());
        let orch = TurnOrchestrator::new(
            retriever,
            completion,
            Arc::new(registry),
            logger.clone(),
            Persona::default(),
        );
        (orch, logger)
    }

    async fn wait_for_log(logger: &heatline_audit::InMemoryTurnLog, expected: usize) {
        for _ in 0..100 {
            if logger.count().await >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("audit sink never received {expected} turn(s)");
    }

    // --- The furnace scenario ---

    #[tokio::test]
    async fn direct_answer_passes_through_verbatim() {
        let (orch, logger) = orchestrator(
            Arc::new(FixedRetriever {
                snippets: vec![ContextSnippet::new("Check filter before servicing", 0.9)],
            }),
            Arc::new(FixedCompletion::direct(
                "Check your filter; call for service if it persists.",
            )),
            stub_registry(&[]).0,
        );

        let turn = orch.run("acme", "furnace not heating").await;
        assert_eq!(
            turn.final_answer,
            "Check your filter; call for service if it persists."
        );
        assert_eq!(turn.retrieved_context.len(), 1);
        assert!(turn.tool_invocations.is_empty());

        wait_for_log(&logger, 1).await;
        let logged = logger.turns().await;
        assert_eq!(logged[0].final_answer, turn.final_answer);
    }

    #[tokio::test]
    async fn tool_outcomes_keep_request_order() {
        let (registry, _) = stub_registry(&["alpha", "beta", "gamma"]);
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::requests(
                None,
                vec![("alpha", "{}"), ("beta", "{}"), ("gamma", "{}")],
            )),
            registry,
        );

        let turn = orch.run("acme", "do all three").await;
        let lines: Vec<&str> = turn.final_answer.lines().collect();
        assert_eq!(
            lines,
            vec!["alpha: alpha done", "beta: beta done", "gamma: gamma done"]
        );
        assert_eq!(turn.tool_invocations.len(), 3);
        assert!(turn.invocations_terminal());
    }

    #[tokio::test]
    async fn unknown_tool_isolated_to_its_own_line() {
        let (registry, _) = stub_registry(&["alpha", "gamma"]);
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::requests(
                None,
                vec![("alpha", "{}"), ("ghost", "{}"), ("gamma", "{}")],
            )),
            registry,
        );

        let turn = orch.run("acme", "mixed bag").await;
        let lines: Vec<&str> = turn.final_answer.lines().collect();
        assert_eq!(lines[0], "alpha: alpha done");
        assert_eq!(lines[1], "ghost: unknown action");
        assert_eq!(lines[2], "gamma: gamma done");
        assert_eq!(turn.tool_invocations.len(), 3);
    }

    #[tokio::test]
    async fn booking_scenario_aggregates_confirmation() {
        let registry = heatline_tools::default_registry(Duration::from_secs(5)).unwrap();
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::requests(
                None,
                vec![(
                    "book_appointment",
                    r#"{"time": "2025-01-01T10:00", "details": "furnace repair"}"#,
                )],
            )),
            registry,
        );

        let turn = orch.run("acme", "book me in for new year").await;
        assert!(turn
            .final_answer
            .contains("Appointment booked for 2025-01-01T10:00."));
        assert!(turn.tool_invocations[0].outcome.is_success());
    }

    #[tokio::test]
    async fn validation_failure_folds_into_answer() {
        let mut registry = ToolRegistry::new(Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(
                ToolSpec::new(
                    "send_sms",
                    "stub",
                    vec![ParamSpec::required("phone", ParamKind::String, "number")],
                ),
                Arc::new(StubHandler {
                    payload: "sent".into(),
                    calls: calls.clone(),
                }),
            )
            .unwrap();

        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::requests(None, vec![("send_sms", "{}")])),
            registry,
        );

        let turn = orch.run("acme", "text them").await;
        assert!(turn.final_answer.starts_with("send_sms:"));
        assert!(turn.final_answer.contains("phone"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!turn.final_answer.is_empty());
    }

    #[tokio::test]
    async fn preamble_leads_the_aggregated_answer() {
        let (registry, _) = stub_registry(&["alpha"]);
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::requests(
                Some("On it."),
                vec![("alpha", "{}")],
            )),
            registry,
        );

        let turn = orch.run("acme", "go").await;
        let lines: Vec<&str> = turn.final_answer.lines().collect();
        assert_eq!(lines, vec!["On it.", "alpha: alpha done"]);
        assert_eq!(turn.model_answer.as_deref(), Some("On it."));
    }

    #[tokio::test]
    async fn empty_request_list_falls_back_to_preamble() {
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::requests(Some("Nothing to do."), vec![])),
            stub_registry(&[]).0,
        );

        let turn = orch.run("acme", "hm").await;
        assert_eq!(turn.final_answer, "Nothing to do.");
    }

    #[tokio::test]
    async fn empty_request_list_without_preamble_apologizes() {
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::requests(None, vec![])),
            stub_registry(&[]).0,
        );

        let turn = orch.run("acme", "hm").await;
        assert!(turn.final_answer.contains("(555) 987-6643"));
    }

    // --- Degrade paths ---

    #[tokio::test]
    async fn retrieval_failure_degrades_to_empty_context() {
        let (orch, _) = orchestrator(
            Arc::new(BrokenRetriever),
            Arc::new(FixedCompletion::direct("Answered without context.")),
            stub_registry(&[]).0,
        );

        let turn = orch.run("acme", "furnace not heating").await;
        assert!(turn.retrieved_context.is_empty());
        assert_eq!(turn.final_answer, "Answered without context.");
    }

    #[tokio::test]
    async fn completion_failure_uses_fallback_apology() {
        let (registry, handler_calls) = stub_registry(&["alpha"]);
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(BrokenCompletion),
            registry,
        );

        let turn = orch.run("acme", "anything").await;
        assert!(turn.final_answer.contains("(555) 987-6643"));
        assert!(turn.tool_invocations.is_empty());
        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_timeout_uses_fallback_and_skips_dispatch() {
        let (registry, handler_calls) = stub_registry(&["alpha"]);
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(SlowCompletion),
            registry,
        );
        let orch = orch.with_completion_timeout(Duration::from_secs(1));

        let turn = orch.run("acme", "anything").await;
        assert!(turn.final_answer.contains("(555) 987-6643"));
        assert!(turn.tool_invocations.is_empty());
        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_message_short_circuits_without_model_call() {
        let completion = FixedCompletion::direct("should never be consulted");
        let completion_calls = completion.calls.clone();
        let (orch, logger) = orchestrator(
            Arc::new(FixedRetriever {
                snippets: vec![ContextSnippet::new("irrelevant", 0.9)],
            }),
            Arc::new(completion),
            stub_registry(&[]).0,
        );

        let turn = orch.run("acme", "   ").await;
        assert!(turn.final_answer.contains("How can I help?"));
        assert_eq!(completion_calls.load(Ordering::SeqCst), 0);
        assert!(turn.retrieved_context.is_empty());

        // The short-circuited turn is still logged.
        wait_for_log(&logger, 1).await;
    }

    #[tokio::test]
    async fn zero_snippets_is_a_normal_turn() {
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::direct("No knowledge needed.")),
            stub_registry(&[]).0,
        );

        let turn = orch.run("acme", "something obscure").await;
        assert!(turn.retrieved_context.is_empty());
        assert_eq!(turn.final_answer, "No knowledge needed.");
    }

    #[tokio::test]
    async fn logging_failure_never_changes_the_answer() {
        struct FailingLogger;

        #[async_trait]
        impl TurnLogger for FailingLogger {
            fn name(&self) -> &str {
                "failing"
            }
            async fn record(
                &self,
                _turn: Turn,
            ) -> Result<(), heatline_core::error::AuditError> {
                Err(heatline_core::error::AuditError::Sink("disk full".into()))
            }
        }

        let orch = TurnOrchestrator::new(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::direct("Still answered.")),
            Arc::new(stub_registry(&[]).0),
            Arc::new(FailingLogger),
            Persona::default(),
        );

        let turn = orch.run("acme", "hello").await;
        assert_eq!(turn.final_answer, "Still answered.");
    }

    #[tokio::test]
    async fn nameless_request_gets_a_terminal_record() {
        let (orch, _) = orchestrator(
            Arc::new(FixedRetriever { snippets: vec![] }),
            Arc::new(FixedCompletion::requests(None, vec![("", "{}")])),
            stub_registry(&[]).0,
        );

        let turn = orch.run("acme", "do the thing").await;
        assert_eq!(turn.tool_invocations.len(), 1);
        assert_eq!(turn.tool_invocations[0].tool_name, "unknown");
        assert!(turn.invocations_terminal());
        assert!(!turn.final_answer.is_empty());
    }
}
