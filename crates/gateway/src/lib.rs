//! HTTP API gateway for Heatline.
//!
//! One chat endpoint per turn, plus a health check. The gateway owns the
//! transport concerns the orchestrator never sees: CORS preflight,
//! bearer-token validation, and the malformed-request fallback. Tool,
//! retrieval, and completion failures do NOT surface here — by the time
//! a turn reaches the gateway's response it is already a degraded-but-
//! valid answer.
//!
//! Built on Axum.

use axum::extract::rejection::JsonRejection;
use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use heatline_orchestrator::{Persona, TurnOrchestrator};

/// Shared application state for the gateway. Immutable after startup;
/// concurrent requests read it without locking.
pub struct GatewayState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub bearer_tokens: Vec<String>,
    pub fallback_apology: String,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Bearer token authentication on /chat (health stays open)
/// - CORS: configured origins, or any origin when none are configured
/// - Request body size limit (64 KB — chat messages, not uploads)
/// - HTTP trace logging
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    let chat = Router::new()
        .route("/chat", post(chat_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(health_handler))
        .merge(chat)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors_layer(allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS for the chat widget. The reference deployment embeds the widget
/// on arbitrary customer sites, so no configured origins means any
/// origin. Preflight is answered by the layer, before any handler.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
}

/// Start the gateway HTTP server.
///
/// Builds the full stack — retrieval backend, completion client, tool
/// registry, audit sink, orchestrator — once, then serves.
pub async fn start(config: heatline_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = build_state(&config)?;
    let app = build_router(state, &config.gateway.allowed_origins);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build shared state from config: every subsystem constructed once.
pub fn build_state(
    config: &heatline_config::AppConfig,
) -> Result<SharedState, Box<dyn std::error::Error>> {
    let retriever = heatline_retrieval::build_from_config(config);
    let completion = Arc::new(heatline_completion::OpenAiCompatClient::from_config(
        &config.completion,
    ));
    let tools = Arc::new(heatline_tools::default_registry(
        std::time::Duration::from_secs(config.tools.timeout_secs),
    )?);
    let logger = heatline_audit::build_from_config(&config.audit);

    let orchestrator = Arc::new(
        TurnOrchestrator::new(retriever, completion, tools, logger, Persona::from_config(config))
            .with_temperature(config.completion.temperature)
            .with_max_output_tokens(config.completion.max_output_tokens)
            .with_retrieval_timeout(std::time::Duration::from_secs(
                config.retrieval.timeout_secs,
            ))
            .with_completion_timeout(std::time::Duration::from_secs(
                config.completion.timeout_secs,
            ))
            .with_fallback_apology(config.answers.fallback_apology.clone())
            .with_solicitation(config.answers.solicitation.clone()),
    );

    Ok(Arc::new(GatewayState {
        orchestrator,
        bearer_tokens: config.gateway.bearer_tokens.clone(),
        fallback_apology: config.answers.fallback_apology.clone(),
    }))
}

/// Authentication middleware for /chat.
///
/// Requires a valid `Authorization: Bearer <token>` header when tokens
/// are configured; an empty token list leaves the endpoint open. Runs
/// before the orchestrator, which never sees invalid-token requests.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if state.bearer_tokens.is_empty() {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match auth_header {
        Some(token) if state.bearer_tokens.iter().any(|t| t == token) => Ok(next.run(req).await),
        _ => {
            warn!("Unauthorized chat request — missing or invalid bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,

    #[serde(default)]
    tenant_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    content: String,
}

/// `POST /chat` — process one turn.
///
/// A body that cannot be parsed is the one case where the orchestrator
/// cannot be invoked at all: that returns a server error carrying the
/// fixed apology, so the widget still has something to render.
async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed chat request body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse {
                    content: state.fallback_apology.clone(),
                }),
            );
        }
    };

    let tenant_id = payload.tenant_id.as_deref().unwrap_or("default");
    info!(tenant = tenant_id, message_len = payload.message.len(), "Chat request");

    let turn = state.orchestrator.run(tenant_id, &payload.message).await;

    (
        StatusCode::OK,
        Json(ChatResponse {
            content: turn.final_answer,
        }),
    )
}
