use thiserror::Error;

/// Everything that can go wrong while speaking, bucketed by the stage
/// that failed. The pipeline reports exactly one of these per call and
/// never lets one escape to the caller as a hard error.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Model could not be resolved or loaded into the engine.
    #[error("Failed to load voice model: {0}")]
    ModelLoad(String),

    /// The audio output device refused to open a stream.
    #[error("Failed to initialize audio stream: {0}")]
    StreamInit(String),

    /// A synthesized chunk could not be converted or written.
    #[error("Error writing audio data to stream: {0}")]
    AudioWrite(String),
}

impl VoiceError {
    /// The stage name used in structured log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            VoiceError::ModelLoad(_) => "model_load",
            VoiceError::StreamInit(_) => "stream_init",
            VoiceError::AudioWrite(_) => "audio_write",
        }
    }
}
