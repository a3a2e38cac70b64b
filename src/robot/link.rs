//! Command link to the Hackerbot controller.
//!
//! The wire protocol is one JSON object per line in each direction:
//! `{"op": "...", "params": {...}}` out, `{"ok": <value>}` or
//! `{"error": "<message>"}` back. The TCP link is the default; a serial
//! link to the controller board is available behind the `hardware` feature.

use crate::robot::error::RobotError;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// One request/response exchange with the controller.
///
/// Implementations serialize access internally; capability objects share a
/// single link via `Arc`.
#[async_trait]
pub trait CommandLink: Send + Sync {
    async fn request(&self, op: &str, params: Value) -> Result<Value, RobotError>;
}

fn encode_request(op: &str, params: &Value) -> Result<String, RobotError> {
    let frame = json!({ "op": op, "params": params });
    let mut line = serde_json::to_string(&frame)
        .map_err(|e| RobotError::Protocol(format!("failed to encode request: {e}")))?;
    line.push('\n');
    Ok(line)
}

/// Parse a controller reply line into the `ok` payload.
pub(crate) fn decode_reply(line: &str) -> Result<Value, RobotError> {
    let reply: Value = serde_json::from_str(line.trim())
        .map_err(|e| RobotError::Protocol(format!("unparseable reply: {e}")))?;

    if let Some(err) = reply.get("error") {
        let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        return Err(RobotError::Rejected(msg));
    }

    match reply.get("ok") {
        Some(ok) => Ok(ok.clone()),
        None => Err(RobotError::Protocol(
            "reply carries neither 'ok' nor 'error'".into(),
        )),
    }
}

// ── TCP link ────────────────────────────────────────────────────

/// JSON-line link over TCP. Connects lazily on first request and
/// reconnects after a transport failure.
pub struct TcpLink {
    addr: String,
    stream: Mutex<Option<BufReader<tokio::net::TcpStream>>>,
}

impl TcpLink {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            stream: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<BufReader<tokio::net::TcpStream>, RobotError> {
        let stream = tokio::net::TcpStream::connect(&self.addr)
            .await
            .map_err(|e| RobotError::Link(format!("connect {}: {e}", self.addr)))?;
        stream.set_nodelay(true).ok();
        Ok(BufReader::new(stream))
    }
}

#[async_trait]
impl CommandLink for TcpLink {
    async fn request(&self, op: &str, params: Value) -> Result<Value, RobotError> {
        let line = encode_request(op, &params)?;

        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }

        // A transport failure or an uninterpretable reply invalidates
        // the connection (the stream may be mid-frame); the next
        // request reconnects.
        let result = async {
            let stream = guard.as_mut().expect("connection established above");
            stream
                .get_mut()
                .write_all(line.as_bytes())
                .await
                .map_err(|e| RobotError::Link(format!("write: {e}")))?;

            let mut reply = String::new();
            let n = stream
                .read_line(&mut reply)
                .await
                .map_err(|e| RobotError::Link(format!("read: {e}")))?;
            if n == 0 {
                return Err(RobotError::Link("controller closed the connection".into()));
            }
            decode_reply(&reply)
        }
        .await;

        if matches!(result, Err(RobotError::Link(_) | RobotError::Protocol(_))) {
            *guard = None;
        }
        result
    }
}

// ── Serial link ─────────────────────────────────────────────────

#[cfg(feature = "hardware")]
pub use serial::SerialLink;

#[cfg(feature = "hardware")]
mod serial {
    use super::{decode_reply, encode_request, CommandLink, RobotError};
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::sync::Mutex;
    use tokio_serial::SerialPortBuilderExt;

    /// JSON-line link over a serial device (e.g. `/dev/ttyACM0`).
    pub struct SerialLink {
        port: Mutex<BufReader<tokio_serial::SerialStream>>,
    }

    impl SerialLink {
        pub fn open(path: &str, baud: u32) -> Result<Self, RobotError> {
            let port = tokio_serial::new(path, baud)
                .open_native_async()
                .map_err(|e| RobotError::Link(format!("open {path}: {e}")))?;
            Ok(Self {
                port: Mutex::new(BufReader::new(port)),
            })
        }
    }

    #[async_trait]
    impl CommandLink for SerialLink {
        async fn request(&self, op: &str, params: Value) -> Result<Value, RobotError> {
            let line = encode_request(op, &params)?;
            let mut port = self.port.lock().await;

            port.get_mut()
                .write_all(line.as_bytes())
                .await
                .map_err(|e| RobotError::Link(format!("write: {e}")))?;

            let mut reply = String::new();
            let n = port
                .read_line(&mut reply)
                .await
                .map_err(|e| RobotError::Link(format!("read: {e}")))?;
            if n == 0 {
                return Err(RobotError::Link("controller closed the port".into()));
            }
            decode_reply(&reply)
        }
    }
}
