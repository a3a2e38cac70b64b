//! Six-joint arm and gripper.

use crate::robot::error::RobotError;
use crate::robot::link::CommandLink;
use serde_json::json;
use std::sync::Arc;

/// Joints 1–5 travel ±165°; the wrist rotation joint 6 travels ±175°.
pub const JOINT_LIMIT: f64 = 165.0;
pub const WRIST_LIMIT: f64 = 175.0;
pub const ARM_SPEED_RANGE: (i64, i64) = (0, 100);

pub struct Arm {
    link: Arc<dyn CommandLink>,
    pub gripper: Gripper,
}

impl Arm {
    pub(crate) fn new(link: Arc<dyn CommandLink>) -> Self {
        Self {
            gripper: Gripper { link: link.clone() },
            link,
        }
    }

    /// Move a single joint. `joint_id` is 1–6 (1 is the base joint).
    pub async fn move_joint(&self, joint_id: u8, angle: f64, speed: i64) -> Result<(), RobotError> {
        if !(1..=6).contains(&joint_id) {
            return Err(RobotError::invalid(format!(
                "joint_id {joint_id} outside 1..=6"
            )));
        }
        check_joint_angle(joint_id, angle)?;
        check_speed(speed)?;
        self.link
            .request(
                "arm.move_joint",
                json!({ "joint_id": joint_id, "angle": angle, "speed": speed }),
            )
            .await?;
        Ok(())
    }

    /// Move all six joints at once. Angles are in joint order, 1 through 6.
    pub async fn move_joints(&self, angles: [f64; 6], speed: i64) -> Result<(), RobotError> {
        for (i, angle) in angles.iter().enumerate() {
            check_joint_angle(i as u8 + 1, *angle)?;
        }
        check_speed(speed)?;
        self.link
            .request(
                "arm.move_joints",
                json!({ "angles": angles, "speed": speed }),
            )
            .await?;
        Ok(())
    }
}

pub struct Gripper {
    link: Arc<dyn CommandLink>,
}

impl Gripper {
    pub async fn calibrate(&self) -> Result<(), RobotError> {
        self.link
            .request("arm.gripper.calibrate", json!({}))
            .await?;
        Ok(())
    }

    pub async fn open(&self) -> Result<(), RobotError> {
        self.link.request("arm.gripper.open", json!({})).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<(), RobotError> {
        self.link.request("arm.gripper.close", json!({})).await?;
        Ok(())
    }
}

fn check_joint_angle(joint_id: u8, angle: f64) -> Result<(), RobotError> {
    let limit = if joint_id == 6 { WRIST_LIMIT } else { JOINT_LIMIT };
    if angle.is_finite() && (-limit..=limit).contains(&angle) {
        Ok(())
    } else {
        Err(RobotError::invalid(format!(
            "joint {joint_id} angle {angle} outside ±{limit}"
        )))
    }
}

fn check_speed(speed: i64) -> Result<(), RobotError> {
    if (ARM_SPEED_RANGE.0..=ARM_SPEED_RANGE.1).contains(&speed) {
        Ok(())
    } else {
        Err(RobotError::invalid(format!(
            "speed {speed} outside {}..={}",
            ARM_SPEED_RANGE.0, ARM_SPEED_RANGE.1
        )))
    }
}
