//! Head pan/tilt and eye gaze.

use crate::robot::error::RobotError;
use crate::robot::link::CommandLink;
use serde_json::json;
use std::sync::Arc;

/// Documented servo ranges for the head gimbal.
pub const YAW_RANGE: (f64, f64) = (100.0, 260.0);
pub const PITCH_RANGE: (f64, f64) = (150.0, 250.0);
pub const HEAD_SPEED_RANGE: (i64, i64) = (6, 70);

pub struct Head {
    link: Arc<dyn CommandLink>,
    pub eyes: Eyes,
}

impl Head {
    pub(crate) fn new(link: Arc<dyn CommandLink>) -> Self {
        Self {
            eyes: Eyes { link: link.clone() },
            link,
        }
    }

    /// Move the head to the given yaw/pitch. Yaw 100.0–260.0°, pitch
    /// 150.0–250.0°, speed 6 (slow) to 70 (fast).
    pub async fn look(&self, yaw: f64, pitch: f64, speed: i64) -> Result<(), RobotError> {
        check_range("yaw", yaw, YAW_RANGE)?;
        check_range("pitch", pitch, PITCH_RANGE)?;
        if !(HEAD_SPEED_RANGE.0..=HEAD_SPEED_RANGE.1).contains(&speed) {
            return Err(RobotError::invalid(format!(
                "speed {speed} outside {}..={}",
                HEAD_SPEED_RANGE.0, HEAD_SPEED_RANGE.1
            )));
        }
        self.link
            .request(
                "head.look",
                json!({ "yaw": yaw, "pitch": pitch, "speed": speed }),
            )
            .await?;
        Ok(())
    }

    /// Enable or disable idle animation mode.
    pub async fn set_idle_mode(&self, mode: bool) -> Result<(), RobotError> {
        self.link
            .request("head.set_idle_mode", json!({ "mode": mode }))
            .await?;
        Ok(())
    }
}

pub struct Eyes {
    link: Arc<dyn CommandLink>,
}

impl Eyes {
    /// Point the eyes at a position in the view, both axes in [-1.0, 1.0].
    pub async fn gaze(&self, x: f64, y: f64) -> Result<(), RobotError> {
        check_range("x", x, (-1.0, 1.0))?;
        check_range("y", y, (-1.0, 1.0))?;
        self.link
            .request("head.eyes.gaze", json!({ "x": x, "y": y }))
            .await?;
        Ok(())
    }
}

fn check_range(name: &str, value: f64, (lo, hi): (f64, f64)) -> Result<(), RobotError> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(RobotError::invalid(format!(
            "{name} {value} outside {lo}..={hi}"
        )))
    }
}
