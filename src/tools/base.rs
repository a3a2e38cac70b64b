//! Base and map tools.

use super::{optional_bool, require_bool, require_f64, require_i64, Tool, ToolResult};
use crate::robot::{Robot, RobotError};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub(super) fn tools(robot: Arc<Robot>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(MapsGoto(robot.clone())),
        Arc::new(SetMode(robot.clone())),
        Arc::new(Start(robot.clone())),
        Arc::new(Quickmap(robot.clone())),
        Arc::new(Dock(robot.clone())),
        Arc::new(Kill(robot.clone())),
        Arc::new(TriggerBump(robot.clone())),
        Arc::new(Drive(robot.clone())),
        Arc::new(Destroy(robot)),
    ]
}

fn done(op: &str) -> ToolResult {
    ToolResult::ok(format!("{op} command accepted"))
}

fn report(op: &str, result: Result<(), RobotError>) -> ToolResult {
    match result {
        Ok(()) => done(op),
        Err(e) => ToolResult::fail(e.to_string()),
    }
}

struct MapsGoto(Arc<Robot>);

#[async_trait]
impl Tool for MapsGoto {
    fn name(&self) -> &str {
        "maps_goto"
    }

    fn description(&self) -> &str {
        "Navigate the base to a pose on the current map. x and y are in meters, \
         angle in degrees, speed in m/s. Requires base_start to have succeeded."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "x": { "type": "number", "description": "Target X coordinate in meters" },
                "y": { "type": "number", "description": "Target Y coordinate in meters" },
                "angle": { "type": "number", "description": "Target heading in degrees" },
                "speed": { "type": "number", "description": "Travel speed in m/s" },
                "block": { "type": "boolean", "description": "Wait for arrival (default true)" }
            },
            "required": ["x", "y", "angle", "speed"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let x = require_f64(&args, "x")?;
        let y = require_f64(&args, "y")?;
        let angle = require_f64(&args, "angle")?;
        let speed = require_f64(&args, "speed")?;
        let block = optional_bool(&args, "block", true)?;
        Ok(report(
            "maps_goto",
            self.0.base.goto(x, y, angle, speed, block).await,
        ))
    }
}

struct SetMode(Arc<Robot>);

#[async_trait]
impl Tool for SetMode {
    fn name(&self) -> &str {
        "base_set_mode"
    }

    fn description(&self) -> &str {
        "Set the base controller mode."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "mode": { "type": "integer", "description": "Controller mode number" }
            },
            "required": ["mode"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let mode = require_i64(&args, "mode")?;
        Ok(report("base_set_mode", self.0.base.set_mode(mode).await))
    }
}

struct Start(Arc<Robot>);

#[async_trait]
impl Tool for Start {
    fn name(&self) -> &str {
        "base_start"
    }

    fn description(&self) -> &str {
        "Start the base. Must succeed before any movement command will be accepted."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "block": { "type": "boolean", "description": "Wait for startup (default true)" }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let block = optional_bool(&args, "block", true)?;
        Ok(report("base_start", self.0.base.start(block).await))
    }
}

struct Quickmap(Arc<Robot>);

#[async_trait]
impl Tool for Quickmap {
    fn name(&self) -> &str {
        "base_quickmap"
    }

    fn description(&self) -> &str {
        "Run the quick mapping process to build a map of the surroundings."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "block": { "type": "boolean", "description": "Wait for completion (default true)" }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let block = optional_bool(&args, "block", true)?;
        Ok(report("base_quickmap", self.0.base.quickmap(block).await))
    }
}

struct Dock(Arc<Robot>);

#[async_trait]
impl Tool for Dock {
    fn name(&self) -> &str {
        "base_dock"
    }

    fn description(&self) -> &str {
        "Drive the base back onto its charging dock."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "block": { "type": "boolean", "description": "Wait for docking (default true)" }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let block = optional_bool(&args, "block", true)?;
        Ok(report("base_dock", self.0.base.dock(block).await))
    }
}

struct Kill(Arc<Robot>);

#[async_trait]
impl Tool for Kill {
    fn name(&self) -> &str {
        "base_kill"
    }

    fn description(&self) -> &str {
        "Emergency stop. Halts all base movement immediately; base_start is \
         required before the base will move again."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        Ok(report("base_kill", self.0.base.kill().await))
    }
}

struct TriggerBump(Arc<Robot>);

#[async_trait]
impl Tool for TriggerBump {
    fn name(&self) -> &str {
        "base_trigger_bump"
    }

    fn description(&self) -> &str {
        "Enable or disable the left and right bump sensors."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "left": { "type": "boolean", "description": "Enable the left bump sensor" },
                "right": { "type": "boolean", "description": "Enable the right bump sensor" }
            },
            "required": ["left", "right"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let left = require_bool(&args, "left")?;
        let right = require_bool(&args, "right")?;
        Ok(report(
            "base_trigger_bump",
            self.0.base.trigger_bump(left, right).await,
        ))
    }
}

struct Drive(Arc<Robot>);

#[async_trait]
impl Tool for Drive {
    fn name(&self) -> &str {
        "base_drive"
    }

    fn description(&self) -> &str {
        "Set base velocity. Linear velocity in mm/s (positive is forward), \
         angular velocity in degrees/s (positive is counter-clockwise)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "l_vel": { "type": "integer", "description": "Linear velocity in mm/s" },
                "a_vel": { "type": "integer", "description": "Angular velocity in degrees/s" },
                "block": { "type": "boolean", "description": "Wait for acknowledgement (default true)" }
            },
            "required": ["l_vel", "a_vel"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let l_vel = require_i64(&args, "l_vel")?;
        let a_vel = require_i64(&args, "a_vel")?;
        let block = optional_bool(&args, "block", true)?;
        Ok(report(
            "base_drive",
            self.0.base.drive(l_vel, a_vel, block).await,
        ))
    }
}

struct Destroy(Arc<Robot>);

#[async_trait]
impl Tool for Destroy {
    fn name(&self) -> &str {
        "base_destroy"
    }

    fn description(&self) -> &str {
        "Shut the base down, optionally docking first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "auto_dock": { "type": "boolean", "description": "Dock before shutdown (default false)" }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let auto_dock = optional_bool(&args, "auto_dock", false)?;
        Ok(report("base_destroy", self.0.base.destroy(auto_dock).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct RecordingLink {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl crate::robot::CommandLink for RecordingLink {
        async fn request(&self, op: &str, params: Value) -> Result<Value, RobotError> {
            self.calls.lock().push((op.to_string(), params));
            Ok(Value::Null)
        }
    }

    fn robot() -> (Arc<Robot>, Arc<RecordingLink>) {
        let link = Arc::new(RecordingLink {
            calls: Mutex::new(Vec::new()),
        });
        (Arc::new(Robot::with_link(link.clone())), link)
    }

    #[tokio::test]
    async fn drive_without_start_fails_in_band() {
        let (robot, _) = robot();
        let tool = Drive(robot);
        let result = tool
            .execute(json!({ "l_vel": 100, "a_vel": 0 }))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not started"));
    }

    #[tokio::test]
    async fn start_then_drive_reaches_the_wire_with_defaults() {
        let (robot, link) = robot();
        Start(robot.clone())
            .execute(json!({}))
            .await
            .unwrap();
        let result = Drive(robot)
            .execute(json!({ "l_vel": 150, "a_vel": -20 }))
            .await
            .unwrap();
        assert!(result.success);
        let calls = link.calls.lock();
        assert_eq!(calls[0].1["block"], true, "block defaults to true");
        assert_eq!(calls[1].0, "base.drive");
        assert_eq!(calls[1].1["l_vel"], 150);
    }

    #[tokio::test]
    async fn missing_required_arg_is_an_execute_error() {
        let (robot, _) = robot();
        let err = TriggerBump(robot)
            .execute(json!({ "left": true }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("right"));
    }

    #[tokio::test]
    async fn destroy_defaults_auto_dock_off() {
        let (robot, link) = robot();
        Destroy(robot).execute(json!({})).await.unwrap();
        assert_eq!(link.calls.lock()[0].1["auto_dock"], false);
    }

    #[tokio::test]
    async fn goto_requires_start_first() {
        let (robot, link) = robot();
        let result = MapsGoto(robot)
            .execute(json!({ "x": 1.0, "y": 2.0, "angle": 0.0, "speed": 0.3 }))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(link.calls.lock().is_empty());
    }
}
