//! HTTP gateway for orderchat.
//!
//! Serves the turn API (plain and SSE), the UI resource endpoint, and a
//! health check. Built on Axum.

pub mod api;
pub mod sse;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use tracing::{info, warn};

use orderchat_agent::Orchestrator;
use orderchat_config::AppConfig;
use orderchat_core::error::Error;
use orderchat_core::session::SessionConnector;
use orderchat_core::tool::ToolDefinition;
use orderchat_providers::OpenAiCompatModel;
use orderchat_session::{ToolSessionClient, connector_for};

pub use api::{ApiState, SharedApiState, TurnAction, TurnRequest, api_router};

/// Build the full router: `/health` plus the API nested under `/api`.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Build the API state from configuration.
///
/// A missing model credential does not stop the gateway; turns fail with
/// the configuration error instead, and UI resources stay available.
pub async fn build_state(config: &AppConfig) -> Result<SharedApiState, Error> {
    let connector = connector_for(&config.tool_server)?;

    let agent = match OpenAiCompatModel::from_config(&config.model) {
        Ok(model) => {
            let tools = discover_tools(connector.clone()).await?;
            info!(
                model = %model.model(),
                tools = tools.len(),
                "Agent ready"
            );
            let mut agent = Orchestrator::new(Arc::new(model), tools, connector.clone());
            if let Some(max) = config.model.max_tokens {
                agent = agent.with_max_tokens(max);
            }
            Ok(Arc::new(agent))
        }
        Err(e) => {
            warn!(error = %e, "Model unavailable; chat turns will fail");
            Err(e.to_string())
        }
    };

    Ok(Arc::new(ApiState { agent, connector }))
}

/// Ask the tool server which tools it offers.
pub async fn discover_tools(
    connector: Arc<dyn SessionConnector>,
) -> Result<Vec<ToolDefinition>, Error> {
    let client = ToolSessionClient::new(connector);
    let tools = client.list_tools().await;
    if let Err(e) = client.close().await {
        warn!(error = %e, "Failed to close tool session");
    }
    Ok(tools?)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(&config).await?;
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use orderchat_config::ToolTransport;
    use orderchat_session::InProcessConnector;
    use tower::ServiceExt;

    fn in_process_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.tool_server.transport = ToolTransport::InProcess;
        config
    }

    #[tokio::test]
    async fn health_endpoint() {
        let state = Arc::new(ApiState {
            agent: Err("not configured".into()),
            connector: Arc::new(InProcessConnector::builtin().unwrap()),
        });
        let app = build_router(state);

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn state_without_credential_keeps_resources() {
        let state = build_state(&in_process_config()).await.unwrap();
        assert!(state.agent.as_ref().is_err_and(|e| e.contains("API key")));

        let app = build_router(state);
        let req = Request::builder()
            .uri("/api/ui-resources/order_detail")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn state_with_credential_discovers_tools() {
        let mut config = in_process_config();
        config.model.api_key = Some("sk-test".into());
        config.model.max_tokens = Some(512);

        let state = build_state(&config).await.unwrap();
        let agent = state.agent.as_ref().unwrap();
        let names: Vec<&str> = agent.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["get_order_detail", "get_orders"]);
        assert!(agent.tools()[1].parameters.is_object());
    }
}
