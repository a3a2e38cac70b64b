#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use hackerbot::config::{validate_robot_config, Config};
use hackerbot::mcp::{run_server, AppState};
use hackerbot::robot::Robot;
use hackerbot::voice;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "hackerbot", version, about = "Hackerbot MCP server and CLI")]
struct Cli {
    /// Override the config directory (default: ~/.hackerbot)
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server
    Serve {
        /// Bind host, overriding [server].host
        #[arg(long)]
        host: Option<String>,
        /// Bind port, overriding [server].port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Speak text through the robot's speaker and exit
    Speak {
        /// Text to speak
        text: String,
        /// Voice model path or URL, overriding [voice].default_model
        #[arg(long)]
        model: Option<String>,
        /// Speaker ID for multi-speaker models, overriding [voice].speaker_id
        #[arg(long)]
        speaker: Option<u32>,
    },
    /// Print base telemetry and exit
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Some(dir) = &cli.config_dir {
        std::env::set_var("HACKERBOT_CONFIG_DIR", dir);
    }
    let config = Config::load_or_init().await?;
    validate_robot_config(&config.robot);

    match cli.command {
        Command::Serve { host, port } => {
            let robot = Arc::new(Robot::connect(&config.robot)?);
            let pipeline = Arc::new(voice::pipeline_from_config(&config));
            let state = AppState::new(robot, pipeline, config.voice.default_model.clone());
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            run_server(&host, port, state).await
        }
        Command::Speak {
            text,
            model,
            speaker,
        } => {
            let Some(model) = model.or_else(|| config.voice.default_model.clone()) else {
                bail!("no voice model: pass --model or set [voice].default_model");
            };
            let pipeline = voice::pipeline_from_config(&config);
            let outcome =
                tokio::task::spawn_blocking(move || pipeline.speak(&model, &text, speaker))
                    .await?;
            println!("{}", outcome.message());
            if !outcome.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Status => {
            let robot = Robot::connect(&config.robot)?;
            let status = robot.base.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
    }
}
