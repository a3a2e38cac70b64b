//! HTTP transport and method dispatch for the MCP endpoint.
//!
//! One route does all the work: `POST /mcp` carries JSON-RPC both ways.
//! Notifications get an empty `202 Accepted`. Tool failures travel
//! in-band (`isError` on the call result); protocol errors use the
//! JSON-RPC error object.

use crate::mcp::protocol::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::resources::Resource;
use crate::robot::Robot;
use crate::tools::{Tool, ToolResult};
use crate::voice::SpeechPipeline;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, info, warn};

const MAX_BODY_BYTES: usize = 1024 * 1024;
// Generous: blocking tool calls (goto, quickmap) can run for minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared server state: the tool and resource registries.
#[derive(Clone)]
pub struct AppState {
    tools: Arc<Vec<Arc<dyn Tool>>>,
    resources: Arc<Vec<Arc<dyn Resource>>>,
}

impl AppState {
    pub fn new(
        robot: Arc<Robot>,
        pipeline: Arc<SpeechPipeline>,
        default_model: Option<String>,
    ) -> Self {
        Self {
            tools: Arc::new(crate::tools::all_tools(
                robot.clone(),
                pipeline,
                default_model,
            )),
            resources: Arc::new(crate::resources::all_resources(robot)),
        }
    }
}

/// The full MCP router with body-limit and timeout layers applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn run_server(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("MCP server listening on {addr}");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

async fn handle_mcp(State(state): State<AppState>, body: String) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Unparseable MCP request: {e}");
            return Json(JsonRpcResponse::error(
                Value::Null,
                PARSE_ERROR,
                format!("parse error: {e}"),
            ))
            .into_response();
        }
    };

    match dispatch(&state, request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Route one JSON-RPC request. Returns `None` for notifications.
pub async fn dispatch(state: &AppState, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    if !request.is_valid_version() {
        let id = request.id.unwrap_or(Value::Null);
        return Some(JsonRpcResponse::error(
            id,
            INVALID_REQUEST,
            "jsonrpc must be \"2.0\"",
        ));
    }

    if request.is_notification() {
        debug!(method = %request.method, "Notification");
        return None;
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    debug!(method = %request.method, "MCP request");

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {}, "resources": {} },
                "serverInfo": {
                    "name": "hackerbot",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => {
            let tools: Vec<Value> = state
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name(),
                        "description": tool.description(),
                        "inputSchema": tool.parameters_schema(),
                    })
                })
                .collect();
            JsonRpcResponse::success(id, json!({ "tools": tools }))
        }
        "tools/call" => call_tool(state, id, &request.params).await,
        "resources/list" => {
            let resources: Vec<Value> = state
                .resources
                .iter()
                .map(|resource| {
                    json!({
                        "uri": resource.uri(),
                        "name": resource.name(),
                        "description": resource.description(),
                        "mimeType": resource.mime_type(),
                    })
                })
                .collect();
            JsonRpcResponse::success(id, json!({ "resources": resources }))
        }
        "resources/read" => read_resource(state, id, &request.params).await,
        other => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("unknown method '{other}'")),
    };
    Some(response)
}

async fn call_tool(state: &AppState, id: Value, params: &Value) -> JsonRpcResponse {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return JsonRpcResponse::error(id, INVALID_PARAMS, "missing tool name");
    };
    let Some(tool) = state.tools.iter().find(|t| t.name() == name) else {
        return JsonRpcResponse::error(id, INVALID_PARAMS, format!("unknown tool '{name}'"));
    };
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    // Execution failures stay in-band; the RPC itself succeeded.
    let result = match tool.execute(args).await {
        Ok(result) => result,
        Err(e) => {
            warn!(tool = name, "Tool execution error: {e:#}");
            ToolResult::fail(e.to_string())
        }
    };

    JsonRpcResponse::success(
        id,
        json!({
            "content": [{ "type": "text", "text": result.text() }],
            "isError": !result.success,
        }),
    )
}

async fn read_resource(state: &AppState, id: Value, params: &Value) -> JsonRpcResponse {
    let Some(uri) = params.get("uri").and_then(Value::as_str) else {
        return JsonRpcResponse::error(id, INVALID_PARAMS, "missing resource uri");
    };
    let Some(resource) = state.resources.iter().find(|r| r.matches(uri)) else {
        return JsonRpcResponse::error(id, INVALID_PARAMS, format!("unknown resource '{uri}'"));
    };

    match resource.read(uri).await {
        Ok(text) => JsonRpcResponse::success(
            id,
            json!({
                "contents": [{
                    "uri": uri,
                    "mimeType": resource.mime_type(),
                    "text": text,
                }]
            }),
        ),
        Err(e) => {
            warn!(uri, "Resource read failed: {e:#}");
            JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string())
        }
    }
}
