//! The speech pipeline: resolve a model, load it, open an audio
//! stream, then synthesize/convert/write chunk by chunk.
//!
//! Failure handling is deliberate: the first failing stage wins, later
//! stages never run, and the outcome comes back as data rather than an
//! `Err` so callers (the MCP tool, the CLI) report it and move on.
//! Every call emits exactly one report, success or failure.

use crate::voice::engine::VoiceEngine;
use crate::voice::error::VoiceError;
use crate::voice::output::{bytes_to_samples, AudioOutput};
use crate::voice::resolver::ModelResolver;
use tracing::{error, info};

/// What a speak call produced. Never an `Err`: the pipeline absorbs
/// failures into this value after reporting them.
#[derive(Debug)]
pub enum SpeakOutcome {
    Completed,
    Failed(VoiceError),
}

impl SpeakOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SpeakOutcome::Completed)
    }

    /// The human-readable report for this outcome. Stable text: tools
    /// and tests both key off it.
    pub fn message(&self) -> String {
        match self {
            SpeakOutcome::Completed => "Finished speaking.".into(),
            SpeakOutcome::Failed(err) => err.to_string(),
        }
    }
}

pub struct SpeechPipeline {
    resolver: Box<dyn ModelResolver>,
    engine: Box<dyn VoiceEngine>,
    output: Box<dyn AudioOutput>,
}

impl SpeechPipeline {
    pub fn new(
        resolver: Box<dyn ModelResolver>,
        engine: Box<dyn VoiceEngine>,
        output: Box<dyn AudioOutput>,
    ) -> Self {
        Self {
            resolver,
            engine,
            output,
        }
    }

    /// Speak `text` with the voice named by `source`, optionally as a
    /// specific speaker of a multi-speaker model. Blocking; run it on a
    /// blocking thread from async contexts.
    pub fn speak(&self, source: &str, text: &str, speaker: Option<u32>) -> SpeakOutcome {
        let outcome = match self.run(source, text, speaker) {
            Ok(()) => SpeakOutcome::Completed,
            Err(err) => SpeakOutcome::Failed(err),
        };
        match &outcome {
            SpeakOutcome::Completed => info!("Finished speaking."),
            SpeakOutcome::Failed(err) => error!(stage = err.stage(), "{err}"),
        }
        outcome
    }

    fn run(&self, source: &str, text: &str, speaker: Option<u32>) -> Result<(), VoiceError> {
        let model = self.resolver.resolve(source)?;
        let voice = self.engine.load(&model)?;

        // The sink is scoped to this call: dropped on every exit path,
        // including mid-stream failure.
        let mut sink = self.output.open(voice.sample_rate())?;

        let chunks = voice.synthesize(text, speaker)?;
        for chunk in chunks {
            let samples = bytes_to_samples(&chunk?)?;
            sink.write(&samples)?;
        }
        sink.drain()
    }
}
