//! Synthesis engines. The shipping engine shells out to piper and
//! streams raw PCM from its stdout; tests substitute in-memory fakes
//! through the same traits.

use crate::voice::error::VoiceError;
use crate::voice::resolver::ResolvedModel;
use serde::Deserialize;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tracing::debug;

/// Chunk size for reads off the synthesizer. Roughly 90ms of mono
/// 16-bit audio at 22.05kHz, small enough that playback starts while
/// synthesis is still running.
const CHUNK_BYTES: usize = 4096;

/// A lazily-produced sequence of raw little-endian i16 PCM byte chunks.
pub type ChunkStream = Box<dyn Iterator<Item = Result<Vec<u8>, VoiceError>> + Send>;

/// A voice model loaded and ready to synthesize.
pub trait LoadedVoice: Send + Sync {
    /// Output sample rate in Hz, mono.
    fn sample_rate(&self) -> u32;

    /// Synthesize `text` into a stream of PCM chunks, optionally as a
    /// specific speaker of a multi-speaker model (`None` falls back to
    /// the engine's configured default). Synthesis runs concurrently
    /// with consumption; failures surface through the iterator as
    /// [`VoiceError::AudioWrite`].
    fn synthesize(&self, text: &str, speaker: Option<u32>) -> Result<ChunkStream, VoiceError>;
}

impl std::fmt::Debug for dyn LoadedVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedVoice")
            .field("sample_rate", &self.sample_rate())
            .finish_non_exhaustive()
    }
}

/// Loads resolved models into something that can speak.
pub trait VoiceEngine: Send + Sync {
    fn load(&self, model: &ResolvedModel) -> Result<Box<dyn LoadedVoice>, VoiceError>;
}

// ── Piper ─────────────────────────────────────────────────────────

/// Engine backed by the `piper` binary.
pub struct PiperVoiceEngine {
    piper_path: Option<PathBuf>,
    speaker_id: Option<u32>,
}

impl PiperVoiceEngine {
    pub fn new(piper_path: Option<PathBuf>, speaker_id: Option<u32>) -> Self {
        Self {
            piper_path,
            speaker_id,
        }
    }

    fn locate_binary(&self) -> Result<PathBuf, VoiceError> {
        match &self.piper_path {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(VoiceError::ModelLoad(format!(
                "piper binary not found at {}",
                path.display()
            ))),
            None => which::which("piper")
                .map_err(|_| VoiceError::ModelLoad("piper binary not found on PATH".into())),
        }
    }
}

/// The slice of the `.onnx.json` sidecar we care about.
#[derive(Deserialize)]
struct ModelConfig {
    audio: AudioConfig,
}

#[derive(Deserialize)]
struct AudioConfig {
    sample_rate: u32,
}

impl VoiceEngine for PiperVoiceEngine {
    fn load(&self, model: &ResolvedModel) -> Result<Box<dyn LoadedVoice>, VoiceError> {
        let binary = self.locate_binary()?;
        let raw = fs::read_to_string(&model.config_path).map_err(|e| {
            VoiceError::ModelLoad(format!("read {}: {e}", model.config_path.display()))
        })?;
        let config: ModelConfig = serde_json::from_str(&raw).map_err(|e| {
            VoiceError::ModelLoad(format!("parse {}: {e}", model.config_path.display()))
        })?;
        debug!(
            model = %model.model_path.display(),
            sample_rate = config.audio.sample_rate,
            "Loaded piper voice"
        );
        Ok(Box::new(PiperVoice {
            binary,
            model_path: model.model_path.clone(),
            sample_rate: config.audio.sample_rate,
            default_speaker: self.speaker_id,
        }))
    }
}

struct PiperVoice {
    binary: PathBuf,
    model_path: PathBuf,
    sample_rate: u32,
    default_speaker: Option<u32>,
}

impl LoadedVoice for PiperVoice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn synthesize(&self, text: &str, speaker: Option<u32>) -> Result<ChunkStream, VoiceError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--model")
            .arg(&self.model_path)
            .arg("--output-raw")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(speaker) = speaker.or(self.default_speaker) {
            cmd.arg("--speaker").arg(speaker.to_string());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| VoiceError::AudioWrite(format!("spawn piper: {e}")))?;

        // Hand the text over and close stdin so piper knows input is done.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::AudioWrite("piper stdin unavailable".into()))?;
        stdin
            .write_all(text.as_bytes())
            .and_then(|()| stdin.write_all(b"\n"))
            .map_err(|e| VoiceError::AudioWrite(format!("feed piper: {e}")))?;
        drop(stdin);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VoiceError::AudioWrite("piper stdout unavailable".into()))?;

        Ok(Box::new(PiperChunks {
            child,
            stdout,
            done: false,
        }))
    }
}

/// Reads fixed-size chunks off piper's stdout until EOF. Dropping the
/// iterator mid-stream kills the subprocess so abandoned synthesis
/// never leaks a child.
struct PiperChunks {
    child: Child,
    stdout: std::process::ChildStdout,
    done: bool,
}

impl Iterator for PiperChunks {
    type Item = Result<Vec<u8>, VoiceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; CHUNK_BYTES];
        match self.stdout.read(&mut buf) {
            Ok(0) => {
                self.done = true;
                let _ = self.child.wait();
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some(Ok(buf))
            }
            Err(e) => {
                self.done = true;
                Some(Err(VoiceError::AudioWrite(format!("read piper: {e}"))))
            }
        }
    }
}

impl Drop for PiperChunks {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
