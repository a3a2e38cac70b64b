//! Configuration loading and persistence.
//!
//! Everything lives in one `config.toml` under the config directory
//! (`HACKERBOT_CONFIG_DIR` env override, else `~/.hackerbot`). Missing
//! sections and keys take defaults, so a partial file is always valid.

mod schema;

pub use schema::{validate_robot_config, Config, RobotConfig, ServerConfig, VoiceConfig};
