//! MCP resources: read-only views of robot state.
//!
//! Resources answer `resources/read` with a JSON text payload. Unlike
//! tools, a failing resource read is a protocol-level error; there is
//! no in-band failure shape for resources.

use crate::robot::{base::pose_to_value, Robot};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A readable resource. `matches` covers templated URIs such as
/// `maps://{map_id}`.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The URI shown in listings; may contain a `{placeholder}`.
    fn uri(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn mime_type(&self) -> &str {
        "application/json"
    }
    fn matches(&self, uri: &str) -> bool;
    /// Produce the resource text for a concrete URI.
    async fn read(&self, uri: &str) -> Result<String>;
}

/// Every resource the server serves.
pub fn all_resources(robot: Arc<Robot>) -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(MapsList(robot.clone())),
        Arc::new(Position(robot.clone())),
        Arc::new(MapData(robot.clone())),
        Arc::new(BaseStatus(robot)),
    ]
}

struct MapsList(Arc<Robot>);

#[async_trait]
impl Resource for MapsList {
    fn uri(&self) -> &str {
        "maps://list"
    }
    fn name(&self) -> &str {
        "map_list"
    }
    fn description(&self) -> &str {
        "IDs of all maps stored on the robot."
    }
    fn matches(&self, uri: &str) -> bool {
        uri == self.uri()
    }
    async fn read(&self, _uri: &str) -> Result<String> {
        let ids = self.0.base.maps_list().await?;
        serde_json::to_string(&ids).context("serialize map list")
    }
}

struct Position(Arc<Robot>);

#[async_trait]
impl Resource for Position {
    fn uri(&self) -> &str {
        "maps://position"
    }
    fn name(&self) -> &str {
        "map_position"
    }
    fn description(&self) -> &str {
        "Current base pose on the active map: x and y in meters, angle in degrees."
    }
    fn matches(&self, uri: &str) -> bool {
        uri == self.uri()
    }
    async fn read(&self, _uri: &str) -> Result<String> {
        let pose = self.0.base.position().await?;
        serde_json::to_string(&pose_to_value(&pose)).context("serialize pose")
    }
}

struct MapData(Arc<Robot>);

#[async_trait]
impl Resource for MapData {
    fn uri(&self) -> &str {
        "maps://{map_id}"
    }
    fn name(&self) -> &str {
        "map_data"
    }
    fn description(&self) -> &str {
        "Compressed map data for one stored map."
    }
    fn matches(&self, uri: &str) -> bool {
        // Any maps:// URI the concrete resources did not claim.
        uri.strip_prefix("maps://")
            .is_some_and(|id| !id.is_empty() && id != "list" && id != "position")
    }
    async fn read(&self, uri: &str) -> Result<String> {
        let map_id = uri
            .strip_prefix("maps://")
            .context("not a maps:// resource")?;
        let data = self.0.base.fetch_map(map_id).await?;
        Ok(data)
    }
}

struct BaseStatus(Arc<Robot>);

#[async_trait]
impl Resource for BaseStatus {
    fn uri(&self) -> &str {
        "base://status"
    }
    fn name(&self) -> &str {
        "base_status"
    }
    fn description(&self) -> &str {
        "Drive-train telemetry: encoders, speeds, and the wall-facing range sensor."
    }
    fn matches(&self, uri: &str) -> bool {
        uri == self.uri()
    }
    async fn read(&self, _uri: &str) -> Result<String> {
        let status = self.0.base.status().await?;
        serde_json::to_string(&status).context("serialize status")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::{CommandLink, RobotError};
    use parking_lot::Mutex;
    use serde_json::json;

    struct ScriptedLink {
        calls: Mutex<Vec<String>>,
        replies: Mutex<Vec<Result<Value, RobotError>>>,
    }

    #[async_trait]
    impl CommandLink for ScriptedLink {
        async fn request(&self, op: &str, _params: Value) -> Result<Value, RobotError> {
            self.calls.lock().push(op.to_string());
            self.replies.lock().pop().unwrap_or(Ok(Value::Null))
        }
    }

    fn robot_with(reply: Result<Value, RobotError>) -> Arc<Robot> {
        Arc::new(Robot::with_link(Arc::new(ScriptedLink {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(vec![reply]),
        })))
    }

    #[test]
    fn template_matching_claims_only_unclaimed_map_uris() {
        let robot = robot_with(Ok(Value::Null));
        let map_data = MapData(robot);
        assert!(map_data.matches("maps://kitchen"));
        assert!(!map_data.matches("maps://list"));
        assert!(!map_data.matches("maps://position"));
        assert!(!map_data.matches("maps://"));
        assert!(!map_data.matches("base://status"));
    }

    #[tokio::test]
    async fn maps_list_serializes_ids() {
        let robot = robot_with(Ok(json!(["kitchen", "lab"])));
        let text = MapsList(robot).read("maps://list").await.unwrap();
        assert_eq!(text, r#"["kitchen","lab"]"#);
    }

    #[tokio::test]
    async fn position_round_trips_pose() {
        let robot = robot_with(Ok(json!({ "x": 1.5, "y": -0.5, "angle": 90.0 })));
        let text = Position(robot).read("maps://position").await.unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["angle"], 90.0);
    }

    #[tokio::test]
    async fn map_data_extracts_the_id() {
        let robot = robot_with(Ok(json!("H4sIcompressed")));
        let text = MapData(robot).read("maps://kitchen").await.unwrap();
        assert_eq!(text, "H4sIcompressed");
    }

    #[tokio::test]
    async fn link_failure_propagates_as_error() {
        let robot = robot_with(Err(RobotError::Link("connection refused".into())));
        let err = BaseStatus(robot).read("base://status").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn all_resources_have_distinct_uris() {
        let robot = robot_with(Ok(Value::Null));
        let resources = all_resources(robot);
        let mut uris: Vec<_> = resources.iter().map(|r| r.uri().to_string()).collect();
        let count = uris.len();
        uris.sort();
        uris.dedup();
        assert_eq!(uris.len(), count);
        assert_eq!(count, 4);
    }
}
