use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level Hackerbot configuration, loaded from `config.toml`.
///
/// Resolution order: `HACKERBOT_CONFIG_DIR` env → `~/.hackerbot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path to config.toml - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Config directory - computed, not serialized
    #[serde(skip)]
    pub config_dir: PathBuf,

    /// MCP server bind address (`[server]`).
    #[serde(default)]
    pub server: ServerConfig,

    /// Controller link settings (`[robot]`).
    #[serde(default)]
    pub robot: RobotConfig,

    /// Speech synthesis settings (`[voice]`).
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            config_dir: PathBuf::new(),
            server: ServerConfig::default(),
            robot: RobotConfig::default(),
            voice: VoiceConfig::default(),
        }
    }
}

/// MCP server bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host to bind (default: 0.0.0.0, matching the original server)
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Port to bind (default: 8000)
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// How to reach the robot controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotConfig {
    /// "tcp" (default) or "serial" (requires the `hardware` feature)
    #[serde(default = "default_transport")]
    pub transport: String,
    /// Controller host for the tcp transport
    #[serde(default = "default_robot_host")]
    pub host: String,
    /// Controller port for the tcp transport
    #[serde(default = "default_robot_port")]
    pub port: u16,
    /// Serial device path for the serial transport (e.g. /dev/ttyACM0)
    #[serde(default)]
    pub path: Option<String>,
    /// Serial baud rate
    #[serde(default = "default_baud")]
    pub baud: u32,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            host: default_robot_host(),
            port: default_robot_port(),
            path: None,
            baud: default_baud(),
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    /// Directory for downloaded voice models (default: `<config_dir>/models`)
    #[serde(default)]
    pub model_dir: Option<String>,
    /// Explicit path to the piper binary; discovered on PATH when unset
    #[serde(default)]
    pub piper_path: Option<String>,
    /// Model source used by `hackerbot speak` when --model is omitted
    #[serde(default)]
    pub default_model: Option<String>,
    /// Default speaker ID for multi-speaker models
    #[serde(default)]
    pub speaker_id: Option<u32>,
}

fn default_server_host() -> String {
    "0.0.0.0".into()
}
fn default_server_port() -> u16 {
    8000
}
fn default_transport() -> String {
    "tcp".into()
}
fn default_robot_host() -> String {
    "127.0.0.1".into()
}
fn default_robot_port() -> u16 {
    6000
}
fn default_baud() -> u32 {
    230_400
}

// ── Load / save ──────────────────────────────────────────────────

fn default_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("HACKERBOT_CONFIG_DIR") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(shellexpand::tilde(&dir).into_owned()));
        }
    }
    let user_dirs = UserDirs::new().context("Could not determine home directory")?;
    Ok(user_dirs.home_dir().join(".hackerbot"))
}

impl Config {
    /// Load `config.toml`, creating it with defaults on first run.
    pub async fn load_or_init() -> Result<Self> {
        let config_dir = default_config_dir()?;
        let config_path = config_dir.join("config.toml");

        fs::create_dir_all(&config_dir)
            .await
            .with_context(|| format!("Failed to create config directory {config_dir:?}"))?;

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            let config = Config::default();
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render default config")?;
            fs::write(&config_path, rendered)
                .await
                .context("Failed to write default config")?;
            tracing::info!("Created default config at {:?}", config_path);
            config
        };

        config.config_path = config_path;
        config.config_dir = config_dir;
        Ok(config)
    }

    /// Write the current config back to disk.
    pub async fn save(&self) -> Result<()> {
        let rendered = toml::to_string_pretty(self).context("Failed to render config")?;
        fs::write(&self.config_path, rendered)
            .await
            .with_context(|| format!("Failed to write {:?}", self.config_path))
    }

    /// The voice-model cache directory, defaulting under the config dir.
    pub fn model_dir(&self) -> PathBuf {
        match &self.voice.model_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => self.config_dir.join("models"),
        }
    }

    /// Expanded piper binary path, if configured.
    pub fn piper_path(&self) -> Option<PathBuf> {
        self.voice
            .piper_path
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}

/// Warn when a config path points at a missing serial device.
pub fn validate_robot_config(robot: &RobotConfig) {
    if robot.transport == "serial" {
        match &robot.path {
            Some(path) if !Path::new(path).exists() => {
                tracing::warn!("Serial device {path} does not exist (yet)");
            }
            None => tracing::warn!("[robot].transport is serial but [robot].path is unset"),
            _ => {}
        }
    }
}
