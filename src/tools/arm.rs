//! Arm and gripper tools.

use super::{require_f64, require_i64, Tool, ToolResult};
use crate::robot::Robot;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub(super) fn tools(robot: Arc<Robot>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(MoveJoint(robot.clone())),
        Arc::new(MoveJoints(robot.clone())),
        Arc::new(GripperCalibrate(robot.clone())),
        Arc::new(GripperOpen(robot.clone())),
        Arc::new(GripperClose(robot)),
    ]
}

struct MoveJoint(Arc<Robot>);

#[async_trait]
impl Tool for MoveJoint {
    fn name(&self) -> &str {
        "arm_move_joint"
    }

    fn description(&self) -> &str {
        "Move a single arm joint. Joints 1-5 travel -165.0 to 165.0 degrees; \
         the wrist rotation joint 6 travels -175.0 to 175.0. Speed is 0-100."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "joint_id": { "type": "integer", "description": "Joint number, 1 (base) to 6 (wrist)" },
                "angle": { "type": "number", "description": "Target angle in degrees" },
                "speed": { "type": "integer", "description": "Movement speed, 0-100" }
            },
            "required": ["joint_id", "angle", "speed"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let joint_id = require_i64(&args, "joint_id")?;
        let Ok(joint_id) = u8::try_from(joint_id) else {
            bail!("joint_id {joint_id} out of range");
        };
        let angle = require_f64(&args, "angle")?;
        let speed = require_i64(&args, "speed")?;
        Ok(match self.0.arm.move_joint(joint_id, angle, speed).await {
            Ok(()) => ToolResult::ok("arm_move_joint command accepted"),
            Err(e) => ToolResult::fail(e.to_string()),
        })
    }
}

struct MoveJoints(Arc<Robot>);

#[async_trait]
impl Tool for MoveJoints {
    fn name(&self) -> &str {
        "arm_move_joints"
    }

    fn description(&self) -> &str {
        "Move all six arm joints at once. Angles are listed joint 1 through \
         joint 6, in degrees. Speed is 0-100."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "angles": {
                    "type": "array",
                    "items": { "type": "number" },
                    "minItems": 6,
                    "maxItems": 6,
                    "description": "Six joint angles in degrees, joint 1 first"
                },
                "speed": { "type": "integer", "description": "Movement speed, 0-100" }
            },
            "required": ["angles", "speed"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let Some(raw) = args.get("angles").and_then(Value::as_array) else {
            bail!("missing or non-array argument 'angles'");
        };
        if raw.len() != 6 {
            bail!("'angles' must hold exactly 6 values, got {}", raw.len());
        }
        let mut angles = [0.0f64; 6];
        for (slot, value) in angles.iter_mut().zip(raw) {
            *slot = value
                .as_f64()
                .ok_or_else(|| anyhow::anyhow!("'angles' entries must be numbers"))?;
        }
        let speed = require_i64(&args, "speed")?;
        Ok(match self.0.arm.move_joints(angles, speed).await {
            Ok(()) => ToolResult::ok("arm_move_joints command accepted"),
            Err(e) => ToolResult::fail(e.to_string()),
        })
    }
}

struct GripperCalibrate(Arc<Robot>);

#[async_trait]
impl Tool for GripperCalibrate {
    fn name(&self) -> &str {
        "gripper_calibrate"
    }

    fn description(&self) -> &str {
        "Calibrate the gripper. Run once before the first open or close."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        Ok(match self.0.arm.gripper.calibrate().await {
            Ok(()) => ToolResult::ok("gripper_calibrate command accepted"),
            Err(e) => ToolResult::fail(e.to_string()),
        })
    }
}

struct GripperOpen(Arc<Robot>);

#[async_trait]
impl Tool for GripperOpen {
    fn name(&self) -> &str {
        "gripper_open"
    }

    fn description(&self) -> &str {
        "Open the gripper."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        Ok(match self.0.arm.gripper.open().await {
            Ok(()) => ToolResult::ok("gripper_open command accepted"),
            Err(e) => ToolResult::fail(e.to_string()),
        })
    }
}

struct GripperClose(Arc<Robot>);

#[async_trait]
impl Tool for GripperClose {
    fn name(&self) -> &str {
        "gripper_close"
    }

    fn description(&self) -> &str {
        "Close the gripper."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        Ok(match self.0.arm.gripper.close().await {
            Ok(()) => ToolResult::ok("gripper_close command accepted"),
            Err(e) => ToolResult::fail(e.to_string()),
        })
    }
}
