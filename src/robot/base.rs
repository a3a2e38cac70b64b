//! Mobile base: drive, mapping, docking, and status.

use crate::robot::error::RobotError;
use crate::robot::link::CommandLink;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Drive-train telemetry reported by the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseStatus {
    pub timestamp: Option<String>,
    pub left_encoder: Option<i64>,
    pub right_encoder: Option<i64>,
    pub left_speed: Option<f64>,
    pub right_speed: Option<f64>,
    pub left_set_speed: Option<f64>,
    pub right_set_speed: Option<f64>,
    /// Wall-facing time-of-flight distance, millimeters.
    pub wall_tof: Option<f64>,
}

/// Pose of the base on the active map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPose {
    /// X coordinate, meters.
    pub x: f64,
    /// Y coordinate, meters.
    pub y: f64,
    /// Heading, degrees.
    pub angle: f64,
}

/// The mobile base capability.
///
/// Movement commands require a prior successful [`Base::start`]; `kill` and
/// `destroy` clear readiness again. The flag is client-side bookkeeping
/// mirroring the controller's own interlock.
pub struct Base {
    link: Arc<dyn CommandLink>,
    started: AtomicBool,
}

impl Base {
    pub(crate) fn new(link: Arc<dyn CommandLink>) -> Self {
        Self {
            link,
            started: AtomicBool::new(false),
        }
    }

    fn ensure_started(&self) -> Result<(), RobotError> {
        if self.started.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RobotError::NotReady)
        }
    }

    /// Current drive-train status.
    pub async fn status(&self) -> Result<BaseStatus, RobotError> {
        let reply = self.link.request("base.status", json!({})).await?;
        serde_json::from_value(reply)
            .map_err(|e| RobotError::Protocol(format!("bad status payload: {e}")))
    }

    /// Set the controller mode.
    pub async fn set_mode(&self, mode: i64) -> Result<(), RobotError> {
        self.link
            .request("base.set_mode", json!({ "mode": mode }))
            .await?;
        Ok(())
    }

    /// Start the base. Must succeed before any movement command.
    pub async fn start(&self, block: bool) -> Result<(), RobotError> {
        self.link
            .request("base.start", json!({ "block": block }))
            .await?;
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Run the quick mapping process.
    pub async fn quickmap(&self, block: bool) -> Result<(), RobotError> {
        self.ensure_started()?;
        self.link
            .request("base.quickmap", json!({ "block": block }))
            .await?;
        Ok(())
    }

    /// Drive to the docking station.
    pub async fn dock(&self, block: bool) -> Result<(), RobotError> {
        self.ensure_started()?;
        self.link
            .request("base.dock", json!({ "block": block }))
            .await?;
        Ok(())
    }

    /// Stop all movement immediately. The base cannot move again until
    /// [`Base::start`] is called.
    pub async fn kill(&self) -> Result<(), RobotError> {
        self.link.request("base.kill", json!({})).await?;
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Enable or disable the bump sensors.
    pub async fn trigger_bump(&self, left: bool, right: bool) -> Result<(), RobotError> {
        self.link
            .request(
                "base.trigger_bump",
                json!({ "left": left as i64, "right": right as i64 }),
            )
            .await?;
        Ok(())
    }

    /// Set base velocity: linear in mm/s (positive forward), angular in
    /// degrees/s (positive counter-clockwise).
    pub async fn drive(&self, l_vel: i64, a_vel: i64, block: bool) -> Result<(), RobotError> {
        self.ensure_started()?;
        self.link
            .request(
                "base.drive",
                json!({ "l_vel": l_vel, "a_vel": a_vel, "block": block }),
            )
            .await?;
        Ok(())
    }

    /// Stop and shut down the base, optionally docking first.
    pub async fn destroy(&self, auto_dock: bool) -> Result<(), RobotError> {
        self.link
            .request("base.destroy", json!({ "auto_dock": auto_dock }))
            .await?;
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    // ── Maps ────────────────────────────────────────────────────

    /// IDs of all stored maps.
    pub async fn maps_list(&self) -> Result<Vec<String>, RobotError> {
        let reply = self.link.request("maps.list", json!({})).await?;
        serde_json::from_value(reply)
            .map_err(|e| RobotError::Protocol(format!("bad map list payload: {e}")))
    }

    /// Current pose on the active map.
    pub async fn position(&self) -> Result<MapPose, RobotError> {
        let reply = self.link.request("maps.position", json!({})).await?;
        serde_json::from_value(reply)
            .map_err(|e| RobotError::Protocol(format!("bad position payload: {e}")))
    }

    /// Compressed map data for one map ID.
    pub async fn fetch_map(&self, map_id: &str) -> Result<String, RobotError> {
        if map_id.is_empty() {
            return Err(RobotError::invalid("map_id must not be empty"));
        }
        let reply = self
            .link
            .request("maps.fetch", json!({ "map_id": map_id }))
            .await?;
        reply
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RobotError::Protocol("map data is not a string".into()))
    }

    /// Navigate to a pose on the map. Speed in m/s.
    pub async fn goto(
        &self,
        x: f64,
        y: f64,
        angle: f64,
        speed: f64,
        block: bool,
    ) -> Result<(), RobotError> {
        if speed <= 0.0 {
            return Err(RobotError::invalid("speed must be positive"));
        }
        self.ensure_started()?;
        self.link
            .request(
                "maps.goto",
                json!({ "x": x, "y": y, "angle": angle, "speed": speed, "block": block }),
            )
            .await?;
        Ok(())
    }

    /// Whether `start` has succeeded since the last `kill`/`destroy`.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// Serialize a pose for wire-facing consumers.
pub fn pose_to_value(pose: &MapPose) -> Value {
    json!({ "x": pose.x, "y": pose.y, "angle": pose.angle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::link::CommandLink;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Link that records ops and replays canned replies.
    struct ScriptedLink {
        calls: Mutex<Vec<(String, Value)>>,
        replies: Mutex<Vec<Result<Value, RobotError>>>,
    }

    impl ScriptedLink {
        fn new(replies: Vec<Result<Value, RobotError>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies),
            }
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl CommandLink for ScriptedLink {
        async fn request(&self, op: &str, params: Value) -> Result<Value, RobotError> {
            self.calls.lock().push((op.to_string(), params));
            self.replies
                .lock()
                .pop()
                .unwrap_or(Ok(Value::Null))
        }
    }

    fn base_with(replies: Vec<Result<Value, RobotError>>) -> (Base, Arc<ScriptedLink>) {
        let link = Arc::new(ScriptedLink::new(replies));
        (Base::new(link.clone()), link)
    }

    #[tokio::test]
    async fn drive_before_start_is_not_ready() {
        let (base, link) = base_with(vec![]);
        let err = base.drive(100, 0, true).await.unwrap_err();
        assert!(matches!(err, RobotError::NotReady));
        assert!(link.calls().is_empty(), "no wire traffic before start");
    }

    #[tokio::test]
    async fn start_enables_drive_and_kill_disables_it() {
        let (base, link) = base_with(vec![Ok(Value::Null), Ok(Value::Null), Ok(Value::Null)]);
        base.start(true).await.unwrap();
        base.drive(100, -30, true).await.unwrap();
        base.kill().await.unwrap();
        assert!(matches!(
            base.drive(100, 0, true).await.unwrap_err(),
            RobotError::NotReady
        ));

        let ops: Vec<_> = link.calls().into_iter().map(|(op, _)| op).collect();
        assert_eq!(ops, vec!["base.start", "base.drive", "base.kill"]);
    }

    #[tokio::test]
    async fn status_parses_telemetry() {
        let (base, _) = base_with(vec![Ok(json!({
            "timestamp": "2025-05-13T10:00:00Z",
            "left_encoder": 1200,
            "right_encoder": 1185,
            "left_speed": 0.25,
            "right_speed": 0.24,
            "left_set_speed": 0.25,
            "right_set_speed": 0.25,
            "wall_tof": 412.0
        }))]);
        let status = base.status().await.unwrap();
        assert_eq!(status.left_encoder, Some(1200));
        assert_eq!(status.wall_tof, Some(412.0));
    }

    #[tokio::test]
    async fn status_tolerates_missing_fields() {
        let (base, _) = base_with(vec![Ok(json!({ "timestamp": "t" }))]);
        let status = base.status().await.unwrap();
        assert_eq!(status.timestamp.as_deref(), Some("t"));
        assert!(status.wall_tof.is_none());
    }

    #[tokio::test]
    async fn goto_rejects_nonpositive_speed() {
        let (base, link) = base_with(vec![Ok(Value::Null)]);
        base.start(true).await.unwrap();
        let err = base.goto(1.0, 2.0, 90.0, 0.0, true).await.unwrap_err();
        assert!(matches!(err, RobotError::InvalidArgument(_)));
        assert_eq!(link.calls().len(), 1, "only the start call reached the wire");
    }

    #[tokio::test]
    async fn fetch_map_requires_id() {
        let (base, _) = base_with(vec![]);
        let err = base.fetch_map("").await.unwrap_err();
        assert!(matches!(err, RobotError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn controller_rejection_propagates() {
        let (base, _) = base_with(vec![Err(RobotError::Rejected("busy".into()))]);
        let err = base.set_mode(2).await.unwrap_err();
        assert!(matches!(err, RobotError::Rejected(ref m) if m == "busy"));
    }

    #[tokio::test]
    async fn maps_list_parses_ids() {
        let (base, _) = base_with(vec![Ok(json!(["kitchen", "lab"]))]);
        let ids = base.maps_list().await.unwrap();
        assert_eq!(ids, vec!["kitchen".to_string(), "lab".to_string()]);
    }
}
