//! Hackerbot client: capability objects over a shared command link.
//!
//! The robot is a tree of narrow capabilities — [`Base`] (drive, maps,
//! docking), [`Head`] with [`head::Eyes`], [`Arm`] with [`arm::Gripper`] —
//! composed into one [`Robot`] handle. All of them share a single
//! [`CommandLink`] to the controller; none hold state beyond what the
//! wire protocol requires.

pub mod arm;
pub mod base;
pub mod error;
pub mod head;
pub mod link;

pub use arm::Arm;
pub use base::{Base, BaseStatus, MapPose};
pub use error::RobotError;
pub use head::Head;
pub use link::{CommandLink, TcpLink};

#[cfg(feature = "hardware")]
pub use link::SerialLink;

use crate::config::RobotConfig;
use std::sync::Arc;

/// Top-level client handle.
pub struct Robot {
    pub base: Base,
    pub head: Head,
    pub arm: Arm,
}

impl Robot {
    /// Build a robot over an existing link. Used directly by tests; the
    /// server path goes through [`Robot::connect`].
    pub fn with_link(link: Arc<dyn CommandLink>) -> Self {
        Self {
            base: Base::new(link.clone()),
            head: Head::new(link.clone()),
            arm: Arm::new(link),
        }
    }

    /// Build a robot from the `[robot]` config section.
    pub fn connect(config: &RobotConfig) -> anyhow::Result<Self> {
        let link: Arc<dyn CommandLink> = match config.transport.as_str() {
            "tcp" => Arc::new(TcpLink::new(&config.host, config.port)),
            #[cfg(feature = "hardware")]
            "serial" => {
                let path = config
                    .path
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("[robot].path is required for serial transport"))?;
                Arc::new(link::SerialLink::open(path, config.baud)?)
            }
            #[cfg(not(feature = "hardware"))]
            "serial" => {
                anyhow::bail!("serial transport requires building with --features hardware")
            }
            other => anyhow::bail!("unknown [robot].transport '{other}' (expected tcp or serial)"),
        };
        Ok(Self::with_link(link))
    }
}
