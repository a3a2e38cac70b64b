//! MCP tools: every robot command the server exposes.

mod arm;
mod base;
mod head;
mod speak;

use crate::robot::Robot;
use crate::voice::SpeechPipeline;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Result of a tool execution, reported in-band to the MCP client.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            output: error.clone(),
            error: Some(error),
        }
    }

    /// The text shown to the client for this result.
    pub fn text(&self) -> &str {
        &self.output
    }
}

/// A callable tool. `execute` errors are absorbed by the server into an
/// in-band failure; they never become protocol errors.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for the tool's arguments.
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<ToolResult>;
}

/// Every tool the server serves, in a stable listing order.
pub fn all_tools(
    robot: Arc<Robot>,
    pipeline: Arc<SpeechPipeline>,
    default_model: Option<String>,
) -> Vec<Arc<dyn Tool>> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    tools.extend(base::tools(robot.clone()));
    tools.push(Arc::new(speak::SpeakTool::new(pipeline, default_model)));
    tools.extend(head::tools(robot.clone()));
    tools.extend(arm::tools(robot));
    tools
}

// ── Argument helpers ─────────────────────────────────────────────

pub(crate) fn require_f64(args: &Value, key: &str) -> Result<f64> {
    match args.get(key).and_then(Value::as_f64) {
        Some(v) => Ok(v),
        None => bail!("missing or non-numeric argument '{key}'"),
    }
}

pub(crate) fn require_i64(args: &Value, key: &str) -> Result<i64> {
    match args.get(key).and_then(Value::as_i64) {
        Some(v) => Ok(v),
        None => bail!("missing or non-integer argument '{key}'"),
    }
}

pub(crate) fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    match args.get(key).and_then(Value::as_str) {
        Some(v) => Ok(v),
        None => bail!("missing or non-string argument '{key}'"),
    }
}

pub(crate) fn require_bool(args: &Value, key: &str) -> Result<bool> {
    match args.get(key).and_then(Value::as_bool) {
        Some(v) => Ok(v),
        None => bail!("missing or non-boolean argument '{key}'"),
    }
}

pub(crate) fn optional_bool(args: &Value, key: &str, default: bool) -> Result<bool> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(v)) => Ok(*v),
        Some(_) => bail!("argument '{key}' must be a boolean"),
    }
}
