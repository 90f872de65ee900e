//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer one turn of a conversation |
//! | `POST` | `/reindex` | Rescan the corpus and rebuild the index |
//! | `GET`  | `/search?q=&limit=` | Ranked documents for a query |
//! | `POST` | `/feedback` | Append a rating to the feedback log |
//! | `GET`  | `/health` | Status, version and index size |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "conversation_expired", "message": "..." } }
//! ```
//!
//! Codes: `bad_request` (400), `conversation_expired` (410),
//! `backend_error` (502), `internal` (500).
//!
//! All origins, methods and headers are allowed.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use juris_context_core::{ChatError, RankedResult};

use crate::assistant::{Assistant, ChatReply};
use crate::config::Config;
use crate::feedback::{Feedback, FeedbackError, FeedbackLog};

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub feedback: Arc<FeedbackLog>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/reindex", post(handle_reindex))
        .route("/search", get(handle_search))
        .route("/feedback", post(handle_feedback))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Index the corpus (when configured to) and serve until the process exits.
pub async fn run_server(config: &Config, assistant: Arc<Assistant>) -> anyhow::Result<()> {
    if config.corpus.index_on_start {
        let indexer = assistant.clone();
        match tokio::task::spawn_blocking(move || indexer.reindex()).await? {
            Ok(count) => info!(documents = count, "startup indexing finished"),
            Err(e) => warn!(error = %e, "startup indexing failed, serving without context"),
        }
    }

    let state = AppState {
        assistant,
        feedback: Arc::new(FeedbackLog::new(config.feedback.path.clone())),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "juris server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidRequest(message) => AppError::bad_request(message),
            ChatError::ConversationExpired { .. } => AppError {
                status: StatusCode::GONE,
                code: "conversation_expired",
                message: "The chat session has ended. Please start a new session.".to_string(),
            },
            ChatError::Backend(message) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "backend_error",
                message,
            },
        }
    }
}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::InvalidRating(_) | FeedbackError::MissingField(_) => {
                AppError::bad_request(err.to_string())
            }
            other => {
                error!(error = %other, "feedback write failed");
                AppError::internal(other.to_string())
            }
        }
    }
}

// ============ POST /chat ============

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let reply = state
        .assistant
        .chat(&req.conversation_id, &req.message)
        .await?;
    Ok(Json(reply))
}

// ============ POST /reindex ============

#[derive(Serialize)]
struct ReindexResponse {
    documents: usize,
}

async fn handle_reindex(State(state): State<AppState>) -> Result<Json<ReindexResponse>, AppError> {
    let assistant = state.assistant.clone();
    let documents = tokio::task::spawn_blocking(move || assistant.reindex())
        .await
        .map_err(|e| AppError::internal(e.to_string()))?
        .map_err(|e| AppError::internal(format!("{:#}", e)))?;
    Ok(Json(ReindexResponse { documents }))
}

// ============ GET /search ============

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<RankedResult>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    if query.q.trim().is_empty() {
        return Err(AppError::bad_request("q must not be empty"));
    }
    if query.limit == Some(0) {
        return Err(AppError::bad_request("limit must be >= 1"));
    }
    let results = state.assistant.engine().search(&query.q, query.limit);
    Ok(Json(SearchResponse { results }))
}

// ============ POST /feedback ============

#[derive(Serialize)]
struct FeedbackResponse {
    status: &'static str,
}

async fn handle_feedback(
    State(state): State<AppState>,
    Json(feedback): Json<Feedback>,
) -> Result<Json<FeedbackResponse>, AppError> {
    state.feedback.record(&feedback).await?;
    Ok(Json(FeedbackResponse { status: "recorded" }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    documents: usize,
    cached_responses: usize,
    conversations: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        documents: state.assistant.engine().document_count(),
        cached_responses: state.assistant.cache_len(),
        conversations: state.assistant.conversations().len(),
    })
}
