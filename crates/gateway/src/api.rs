//! HTTP API for the order chat agent.
//!
//! Endpoints:
//!
//! - `POST /api/chat`: Run a turn, get `{type: "message", blocks}`
//! - `POST /api/chat/stream`: Run a turn, get an SSE stream of events
//! - `GET  /api/ui-resources/{id}`: Fetch a UI resource definition

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use orderchat_agent::{Orchestrator, error_stream};
use orderchat_core::error::Error;
use orderchat_core::session::SessionConnector;
use orderchat_core::ui::{AgentResponse, UiResourceDefinition};
use orderchat_core::ui_resource_uri;
use orderchat_session::ToolSessionClient;

use crate::sse::sse_response;

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the API routes.
pub struct ApiState {
    /// The turn orchestrator, or why it could not be built (e.g. no model
    /// credential). Turns fail with that message instead of the server
    /// refusing to start.
    pub agent: Result<Arc<Orchestrator>, String>,

    /// Opens tool sessions for UI resource reads.
    pub connector: Arc<dyn SessionConnector>,
}

pub type SharedApiState = Arc<ApiState>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the API router. Nest this under "/api" in the main router.
pub fn api_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/ui-resources/{id}", get(ui_resource_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

/// A turn request: exactly one of `message` or `action`.
///
/// `action.params`, when present, must be a JSON object.
#[derive(Debug, Default, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub action: Option<TurnAction>,
}

/// A UI action the user clicked.
#[derive(Debug, Deserialize)]
pub struct TurnAction {
    pub name: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl TurnRequest {
    /// The user text this request stands for.
    pub fn into_user_text(self) -> Result<String, Error> {
        let message = self.message.filter(|m| !m.trim().is_empty());
        match (message, self.action) {
            (Some(message), None) => Ok(message),
            (None, Some(action)) => {
                let params = match action.params {
                    None | Some(Value::Null) => Value::Object(Default::default()),
                    Some(params @ Value::Object(_)) => params,
                    Some(_) => {
                        return Err(Error::Validation(
                            "`action.params` must be an object".into(),
                        ));
                    }
                };
                Ok(format!(
                    "User clicked action {} with params: {params}",
                    action.name
                ))
            }
            (Some(_), Some(_)) => Err(Error::Validation(
                "send either `message` or `action`, not both".into(),
            )),
            (None, None) => Err(Error::Validation(
                "`message` or `action` is required".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Decode a turn request body and turn it into user text. Body and
/// validation failures both answer with `{error}`.
fn turn_text(payload: Result<Json<TurnRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected turn request body");
        error_response(rejection.status(), rejection.body_text())
    })?;
    request
        .into_user_text()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// `POST /api/chat`: Run a turn to completion.
async fn chat_handler(
    State(state): State<SharedApiState>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<AgentResponse>, ApiError> {
    let user_text = turn_text(payload)?;
    info!(text_len = user_text.len(), "api/chat request");

    let agent = state
        .agent
        .as_ref()
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.clone()))?;

    agent.run(user_text).await.map(Json).map_err(|e| {
        error!(error = %e, "Turn failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

/// `POST /api/chat/stream`: Run a turn, streaming its events.
///
/// Once the request is valid the response is always a 200 event stream;
/// turn failures arrive as a final `error` frame.
async fn chat_stream_handler(
    State(state): State<SharedApiState>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Response {
    let user_text = match turn_text(payload) {
        Ok(text) => text,
        Err(rejection) => return rejection.into_response(),
    };
    info!(text_len = user_text.len(), "api/chat/stream SSE request");

    let events = match &state.agent {
        Ok(agent) => agent.run_stream(user_text),
        Err(message) => {
            warn!(error = %message, "Turn rejected: agent unavailable");
            error_stream(message.clone())
        }
    };

    sse_response(events).into_response()
}

/// `GET /api/ui-resources/{id}`: Read a UI resource through a fresh session.
async fn ui_resource_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<UiResourceDefinition>, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "resourceId is required",
        ));
    }

    match load_ui_resource(state.connector.clone(), id).await {
        Ok(definition) => Ok(Json(definition)),
        Err(Error::Session(e)) if e.is_not_found() => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("UI resource {id} not found"),
        )),
        Err(e) => {
            error!(resource_id = %id, error = %e, "Failed to load UI resource");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load UI resource",
            ))
        }
    }
}

/// Open a session, read `ui-resource://<id>`, parse it, and close.
pub async fn load_ui_resource(
    connector: Arc<dyn SessionConnector>,
    resource_id: &str,
) -> Result<UiResourceDefinition, Error> {
    let client = ToolSessionClient::new(connector);
    let result = read_definition(&client, resource_id).await;
    if let Err(e) = client.close().await {
        warn!(error = %e, "Failed to close tool session");
    }
    result
}

async fn read_definition(
    client: &ToolSessionClient,
    resource_id: &str,
) -> Result<UiResourceDefinition, Error> {
    let contents = client.read_resource(&ui_resource_uri(resource_id)).await?;
    let text = contents
        .into_iter()
        .next()
        .and_then(|c| c.text)
        .ok_or_else(|| Error::Internal(format!("UI resource {resource_id} has no textual content")))?;
    Ok(serde_json::from_str(&text)?)
}
