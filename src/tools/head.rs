//! Head and eye tools.

use super::{require_f64, require_i64, Tool, ToolResult};
use crate::robot::Robot;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub(super) fn tools(robot: Arc<Robot>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(Look(robot.clone())),
        Arc::new(SetIdleMode(robot.clone())),
        Arc::new(Gaze(robot)),
    ]
}

struct Look(Arc<Robot>);

#[async_trait]
impl Tool for Look {
    fn name(&self) -> &str {
        "head_look"
    }

    fn description(&self) -> &str {
        "Point the head. Yaw 100.0-260.0 degrees, pitch 150.0-250.0 degrees, \
         speed 6 (slowest) to 70 (fastest)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "yaw": { "type": "number", "description": "Yaw angle in degrees, 100.0-260.0" },
                "pitch": { "type": "number", "description": "Pitch angle in degrees, 150.0-250.0" },
                "speed": { "type": "integer", "description": "Movement speed, 6-70" }
            },
            "required": ["yaw", "pitch", "speed"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let yaw = require_f64(&args, "yaw")?;
        let pitch = require_f64(&args, "pitch")?;
        let speed = require_i64(&args, "speed")?;
        Ok(match self.0.head.look(yaw, pitch, speed).await {
            Ok(()) => ToolResult::ok("head_look command accepted"),
            Err(e) => ToolResult::fail(e.to_string()),
        })
    }
}

struct SetIdleMode(Arc<Robot>);

#[async_trait]
impl Tool for SetIdleMode {
    fn name(&self) -> &str {
        "head_set_idle_mode"
    }

    fn description(&self) -> &str {
        "Enable or disable the head's idle animation."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "mode": { "type": "boolean", "description": "True to enable idle animation" }
            },
            "required": ["mode"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let mode = super::require_bool(&args, "mode")?;
        Ok(match self.0.head.set_idle_mode(mode).await {
            Ok(()) => ToolResult::ok("head_set_idle_mode command accepted"),
            Err(e) => ToolResult::fail(e.to_string()),
        })
    }
}

struct Gaze(Arc<Robot>);

#[async_trait]
impl Tool for Gaze {
    fn name(&self) -> &str {
        "eyes_gaze"
    }

    fn description(&self) -> &str {
        "Point the eyes at a position in the view. Both axes run -1.0 to 1.0; \
         x is left to right, y is down to up."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "x": { "type": "number", "description": "Horizontal gaze, -1.0 to 1.0" },
                "y": { "type": "number", "description": "Vertical gaze, -1.0 to 1.0" }
            },
            "required": ["x", "y"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let x = require_f64(&args, "x")?;
        let y = require_f64(&args, "y")?;
        Ok(match self.0.head.eyes.gaze(x, y).await {
            Ok(()) => ToolResult::ok("eyes_gaze command accepted"),
            Err(e) => ToolResult::fail(e.to_string()),
        })
    }
}
