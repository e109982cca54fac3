//! End-to-end integration tests for orderchat.
//!
//! These tests run whole turns against the real order tool server, either
//! spawned as `orderchat tool-server` over stdio or served in-process, and
//! drive the HTTP gateway and the UI resource resolver over real sockets.
//! Only the language model is scripted.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use orderchat_agent::testing::{CountingConnector, ScriptedModel, make_tool_call};
use orderchat_agent::{Orchestrator, StreamEvent};
use orderchat_config::{AppConfig, ToolTransport};
use orderchat_core::session::SessionConnector;
use orderchat_core::ui::UiBlock;
use orderchat_core::{Role, ToolDefinition};
use orderchat_gateway::{ApiState, build_router, build_state, discover_tools};
use orderchat_resolver::{ResolveError, UiResourceResolver};
use orderchat_session::{InProcessConnector, StdioConnector, ToolSessionClient};

// ── Helpers ──────────────────────────────────────────────────────────────

/// The real binary, speaking the tool protocol on stdio.
fn stdio_connector() -> Arc<dyn SessionConnector> {
    Arc::new(StdioConnector::new(
        env!("CARGO_BIN_EXE_orderchat"),
        vec!["tool-server".to_string()],
    ))
}

fn in_process() -> Arc<dyn SessionConnector> {
    Arc::new(InProcessConnector::builtin().unwrap())
}

async fn tools_of(connector: &Arc<dyn SessionConnector>) -> Vec<ToolDefinition> {
    discover_tools(connector.clone()).await.unwrap()
}

async fn drain(mut rx: tokio::sync::mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn first_index(events: &[StreamEvent], pred: impl Fn(&StreamEvent) -> bool) -> Option<usize> {
    events.iter().position(pred)
}

async fn serve_gateway(state: orderchat_gateway::SharedApiState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ── E2E: Tool session over stdio ─────────────────────────────────────────

#[tokio::test]
async fn e2e_stdio_session_lists_and_calls_tools() {
    let client = ToolSessionClient::new(stdio_connector());

    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["get_order_detail", "get_orders"]);

    let result = client
        .call_tool("get_order_detail", json!({"orderId": "A001"}))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert_eq!(result.text(), "Order A001 loaded.");
    assert_eq!(result.data().unwrap()["items"].as_array().unwrap().len(), 2);
    assert_eq!(result.ui_hint().unwrap().resource_id, "order_detail");

    let resources = client.list_resources().await.unwrap();
    assert_eq!(resources.len(), 2);

    let err = client
        .read_resource("ui-resource://order_chart")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    client.close().await.unwrap();
    assert!(!client.is_connected().await);
}

// ── E2E: Turns ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_show_my_orders_over_stdio() {
    let connector = Arc::new(CountingConnector::new(stdio_connector()));
    let tools = tools_of(&(connector.clone() as Arc<dyn SessionConnector>)).await;
    let model = Arc::new(
        ScriptedModel::calling(vec![make_tool_call("call_1", "get_orders", json!({}))])
            .streaming(&["You have two orders: ", "A001 is paid and A002 is pending."]),
    );
    let agent = Orchestrator::new(model.clone(), tools, connector.clone());

    let events = drain(agent.run_stream("show my orders")).await;

    let ui = first_index(&events, |e| {
        matches!(e, StreamEvent::Block { block: UiBlock::UiResource { resource_id, .. } } if resource_id == "order_table")
    })
    .expect("order_table block");
    let first_delta =
        first_index(&events, |e| matches!(e, StreamEvent::TextDelta { .. })).expect("a delta");
    assert!(ui < first_delta);

    match &events[ui] {
        StreamEvent::Block {
            block: UiBlock::UiResource { data, .. },
        } => assert_eq!(data["orders"].as_array().unwrap().len(), 2),
        _ => unreachable!(),
    }

    let streamed: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::TextDelta { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert!(events.contains(&StreamEvent::Block {
        block: UiBlock::text(streamed.trim())
    }));
    assert_eq!(events.last(), Some(&StreamEvent::Done));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

    // Tool discovery used its own session; the turn used exactly one more.
    assert_eq!(connector.connects(), 2);
    assert_eq!(connector.closes(), 2);
}

#[tokio::test]
async fn e2e_unknown_order_finishes_with_not_found_prose() {
    let connector = in_process();
    let tools = tools_of(&connector).await;
    let model = Arc::new(
        ScriptedModel::calling(vec![make_tool_call(
            "call_1",
            "get_order_detail",
            json!({"orderId": "Z999"}),
        )])
        .streaming(&["Order Z999 was not found."]),
    );
    let agent = Orchestrator::new(model.clone(), tools, connector);

    let response = agent.run("what about order Z999?").await.unwrap();
    assert_eq!(
        response.blocks,
        vec![UiBlock::text("Order Z999 was not found.")]
    );

    // The summarizer saw the error payload.
    let summary = &model.stream_requests()[0];
    let tool_message = summary
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert!(tool_message.content.contains("Order Z999 not found."));
}

#[tokio::test]
async fn e2e_two_tool_calls_answered_in_order() {
    let connector = in_process();
    let tools = tools_of(&connector).await;
    let model = Arc::new(
        ScriptedModel::calling(vec![
            make_tool_call("call_a", "get_orders", json!({"userId": "u-42"})),
            make_tool_call("call_b", "get_order_detail", json!({"orderId": "A002"})),
        ])
        .streaming(&["A002 contains one orange."]),
    );
    let agent = Orchestrator::new(model.clone(), tools, connector);

    let response = agent.run("details of my pending order").await.unwrap();
    let kinds: Vec<&str> = response
        .blocks
        .iter()
        .map(|b| match b {
            UiBlock::UiResource { resource_id, .. } => resource_id.as_str(),
            UiBlock::Text { .. } => "text",
            UiBlock::Actions { .. } => "actions",
        })
        .collect();
    assert_eq!(kinds, vec!["order_table", "order_detail", "text"]);

    let ids: Vec<String> = model.stream_requests()[0]
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.clone())
        .collect();
    assert_eq!(ids, vec!["call_a", "call_b"]);
}

#[tokio::test]
async fn e2e_unregistered_tool_is_reported_not_raised() {
    let connector = in_process();
    let tools = tools_of(&connector).await;
    let model = Arc::new(
        ScriptedModel::calling(vec![make_tool_call("call_1", "cancel_order", json!({}))])
            .streaming(&["I can't cancel orders."]),
    );
    let agent = Orchestrator::new(model.clone(), tools, connector);

    let events = drain(agent.run_stream("cancel A001")).await;
    assert_eq!(events.last(), Some(&StreamEvent::Done));

    let tool_message = model.stream_requests()[0]
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .cloned()
        .unwrap();
    assert!(tool_message.content.contains("Unknown tool: cancel_order"));
}

#[tokio::test]
async fn e2e_failing_gateway_closes_session_once() {
    let connector = Arc::new(CountingConnector::new(in_process()).with_failing_calls());
    let model = Arc::new(
        ScriptedModel::calling(vec![make_tool_call("call_1", "get_orders", json!({}))])
            .streaming(&["unused"]),
    );
    let agent = Orchestrator::new(model.clone(), Vec::new(), connector.clone());

    let events = drain(agent.run_stream("show my orders")).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error { message } if message.contains("went away")));
    assert!(model.stream_requests().is_empty());
    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.closes(), 1);
}

// ── E2E: HTTP gateway ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_missing_credential_streams_single_error() {
    let mut config = AppConfig::default();
    config.tool_server.transport = ToolTransport::InProcess;
    let app = build_router(build_state(&config).await.unwrap());

    let req = Request::builder()
        .method("POST")
        .uri("/api/chat/stream")
        .header("content-type", "application/json")
        .body(Body::from(json!({"message": "show my orders"}).to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(body.to_vec()).unwrap();
    let frames: Vec<&str> = body.split("\n\n").filter(|f| !f.trim().is_empty()).collect();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].lines().any(|l| l
        .strip_prefix("event:")
        .is_some_and(|name| name.trim() == "error")));
    assert!(frames[0].contains("API key"));
}

#[tokio::test]
async fn e2e_action_turn_over_http() {
    let connector = in_process();
    let tools = tools_of(&connector).await;
    let model = Arc::new(
        ScriptedModel::calling(vec![make_tool_call(
            "call_1",
            "get_order_detail",
            json!({"orderId": "A001"}),
        )])
        .streaming(&["A001 is paid."]),
    );
    let agent = Orchestrator::new(model.clone(), tools, connector.clone());
    let app = build_router(Arc::new(ApiState {
        agent: Ok(Arc::new(agent)),
        connector,
    }));

    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"action": {"name": "get_order_detail", "params": {"id": "A001"}}}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["blocks"][0]["resourceId"], "order_detail");
    assert_eq!(json["blocks"][0]["data"]["id"], "A001");
    assert_eq!(json["blocks"][1]["content"], "A001 is paid.");

    let user = &model.requests()[0].messages[1];
    assert_eq!(
        user.content,
        r#"User clicked action get_order_detail with params: {"id":"A001"}"#
    );
}

// ── E2E: UI resource resolver against a live gateway ─────────────────────

#[tokio::test]
async fn e2e_resolver_fetches_through_gateway() {
    let connector = Arc::new(CountingConnector::new(in_process()));
    let base = serve_gateway(Arc::new(ApiState {
        agent: Err("not needed".into()),
        connector: connector.clone(),
    }))
    .await;
    let resolver = UiResourceResolver::new(Arc::new(orderchat_resolver::HttpFetcher::new(base)));

    let (a, b) = tokio::join!(
        resolver.fetch("order_table"),
        resolver.fetch("order_table")
    );
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(connector.connects(), 1);

    let detail = resolver.fetch("order_detail").await.unwrap();
    assert_eq!(detail.id(), "order_detail");
    resolver.fetch("order_detail").await.unwrap();
    assert_eq!(connector.connects(), 2);
    assert_eq!(connector.closes(), 2);
}

#[tokio::test]
async fn e2e_resolver_unknown_resource_can_be_retried() {
    let base = serve_gateway(Arc::new(ApiState {
        agent: Err("not needed".into()),
        connector: in_process(),
    }))
    .await;
    let resolver = UiResourceResolver::new(Arc::new(orderchat_resolver::HttpFetcher::new(base)));

    let err = resolver.fetch("order_chart").await.unwrap_err();
    assert!(matches!(err, ResolveError::Http { status: 404, .. }));
    assert!(!resolver.is_in_flight("order_chart"));
    assert!(resolver.cached("order_chart").is_none());

    let err = resolver.fetch("order_chart").await.unwrap_err();
    assert!(matches!(err, ResolveError::Http { status: 404, .. }));
}
