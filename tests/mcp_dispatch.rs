//! End-to-end MCP tests: HTTP request in, JSON-RPC response out, with a
//! scripted controller link behind the robot.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hackerbot::mcp::{build_router, AppState};
use hackerbot::robot::{CommandLink, Robot, RobotError};
use hackerbot::voice::engine::{ChunkStream, LoadedVoice, VoiceEngine};
use hackerbot::voice::output::{AudioOutput, AudioSink};
use hackerbot::voice::resolver::{ModelResolver, ResolvedModel};
use hackerbot::voice::{SpeechPipeline, VoiceError};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

struct ScriptedLink {
    calls: Mutex<Vec<(String, Value)>>,
    replies: Mutex<Vec<Result<Value, RobotError>>>,
}

impl ScriptedLink {
    fn new(mut replies: Vec<Result<Value, RobotError>>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(replies),
        })
    }

    fn ops(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(op, _)| op.clone()).collect()
    }
}

#[async_trait]
impl CommandLink for ScriptedLink {
    async fn request(&self, op: &str, params: Value) -> Result<Value, RobotError> {
        self.calls.lock().push((op.to_string(), params));
        self.replies.lock().pop().unwrap_or(Ok(Value::Null))
    }
}

// One-chunk silence voice; enough for base_speak to complete.
struct FakeResolver;

impl ModelResolver for FakeResolver {
    fn resolve(&self, _source: &str) -> Result<ResolvedModel, VoiceError> {
        Ok(ResolvedModel {
            model_path: PathBuf::from("/v/x.onnx"),
            config_path: PathBuf::from("/v/x.onnx.json"),
        })
    }
}

struct FakeEngine;

impl VoiceEngine for FakeEngine {
    fn load(&self, _m: &ResolvedModel) -> Result<Box<dyn LoadedVoice>, VoiceError> {
        Ok(Box::new(FakeVoice))
    }
}

struct FakeVoice;

impl LoadedVoice for FakeVoice {
    fn sample_rate(&self) -> u32 {
        22050
    }
    fn synthesize(&self, _text: &str, _speaker: Option<u32>) -> Result<ChunkStream, VoiceError> {
        Ok(Box::new(std::iter::once(Ok(vec![0u8; 64]))))
    }
}

struct FakeOutput;

impl AudioOutput for FakeOutput {
    fn open(&self, _rate: u32) -> Result<Box<dyn AudioSink>, VoiceError> {
        Ok(Box::new(FakeSink))
    }
}

struct FakeSink;

impl AudioSink for FakeSink {
    fn write(&mut self, _samples: &[i16]) -> Result<(), VoiceError> {
        Ok(())
    }
    fn drain(&mut self) -> Result<(), VoiceError> {
        Ok(())
    }
}

fn app_with(link: Arc<ScriptedLink>) -> axum::Router {
    let robot = Arc::new(Robot::with_link(link));
    let pipeline = Arc::new(SpeechPipeline::new(
        Box::new(FakeResolver),
        Box::new(FakeEngine),
        Box::new(FakeOutput),
    ));
    build_router(AppState::new(robot, pipeline, Some("default.onnx".into())))
}

async fn post_mcp(app: axum::Router, body: Value) -> (StatusCode, Value) {
    post_mcp_raw(app, body.to_string()).await
}

async fn post_mcp_raw(app: axum::Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn initialize_handshake() {
    let (status, body) = post_mcp(
        app_with(ScriptedLink::new(vec![])),
        json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(body["id"], 0);
}

#[tokio::test]
async fn initialized_notification_is_accepted_with_no_body() {
    let (status, body) = post_mcp(
        app_with(ScriptedLink::new(vec![])),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let (status, body) =
        post_mcp_raw(app_with(ScriptedLink::new(vec![])), "{not json".to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn start_then_drive_reaches_the_controller() {
    let link = ScriptedLink::new(vec![Ok(Value::Null), Ok(Value::Null)]);
    let app = app_with(link.clone());

    let (_, body) = post_mcp(
        app.clone(),
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": { "name": "base_start", "arguments": {} }
        }),
    )
    .await;
    assert_eq!(body["result"]["isError"], false);

    let (_, body) = post_mcp(
        app,
        json!({
            "jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": { "name": "base_drive", "arguments": { "l_vel": 100, "a_vel": 0 } }
        }),
    )
    .await;
    assert_eq!(body["result"]["isError"], false);
    assert_eq!(link.ops(), vec!["base.start", "base.drive"]);
}

#[tokio::test]
async fn drive_before_start_fails_in_band() {
    let link = ScriptedLink::new(vec![]);
    let (_, body) = post_mcp(
        app_with(link.clone()),
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": { "name": "base_drive", "arguments": { "l_vel": 100, "a_vel": 0 } }
        }),
    )
    .await;
    assert!(body["error"].is_null(), "tool failure is not an RPC error");
    assert_eq!(body["result"]["isError"], true);
    assert!(link.ops().is_empty());
}

#[tokio::test]
async fn speak_completes_through_the_fake_pipeline() {
    let (_, body) = post_mcp(
        app_with(ScriptedLink::new(vec![])),
        json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": { "name": "base_speak", "arguments": { "text": "hello there" } }
        }),
    )
    .await;
    assert_eq!(body["result"]["isError"], false);
    assert_eq!(body["result"]["content"][0]["text"], "Finished speaking.");
}

#[tokio::test]
async fn read_position_resource() {
    let link = ScriptedLink::new(vec![Ok(json!({ "x": 2.0, "y": 3.0, "angle": 45.0 }))]);
    let (_, body) = post_mcp(
        app_with(link),
        json!({
            "jsonrpc": "2.0", "id": 7, "method": "resources/read",
            "params": { "uri": "maps://position" }
        }),
    )
    .await;
    let text = body["result"]["contents"][0]["text"].as_str().unwrap();
    let pose: Value = serde_json::from_str(text).unwrap();
    assert_eq!(pose["x"], 2.0);
    assert_eq!(body["result"]["contents"][0]["mimeType"], "application/json");
}

#[tokio::test]
async fn read_map_by_template() {
    let link = ScriptedLink::new(vec![Ok(json!("compressed-bytes"))]);
    let (_, body) = post_mcp(
        app_with(link.clone()),
        json!({
            "jsonrpc": "2.0", "id": 8, "method": "resources/read",
            "params": { "uri": "maps://lab" }
        }),
    )
    .await;
    assert_eq!(body["result"]["contents"][0]["text"], "compressed-bytes");
    assert_eq!(link.calls.lock()[0].1["map_id"], "lab");
}

#[tokio::test]
async fn unknown_resource_is_invalid_params() {
    let (_, body) = post_mcp(
        app_with(ScriptedLink::new(vec![])),
        json!({
            "jsonrpc": "2.0", "id": 9, "method": "resources/read",
            "params": { "uri": "cameras://front" }
        }),
    )
    .await;
    assert_eq!(body["error"]["code"], -32602);
}

#[tokio::test]
async fn health_endpoint_answers() {
    let app = app_with(ScriptedLink::new(vec![]));
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
