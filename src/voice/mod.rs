//! Speech synthesis and playback.
//!
//! The pipeline is assembled from three seams — a [`ModelResolver`], a
//! [`VoiceEngine`], and an [`AudioOutput`] — so every stage can be
//! replaced in tests. The shipping assembly is piper over cpal with a
//! download-and-cache resolver.

pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod resolver;

pub use engine::{LoadedVoice, VoiceEngine};
pub use error::VoiceError;
pub use output::{AudioOutput, AudioSink};
pub use pipeline::{SpeakOutcome, SpeechPipeline};
pub use resolver::{CachingResolver, ModelResolver, ResolvedModel};

use crate::config::Config;

/// The production pipeline for this config: caching resolver over the
/// model dir, piper engine, and the default audio output.
pub fn pipeline_from_config(config: &Config) -> SpeechPipeline {
    SpeechPipeline::new(
        Box::new(CachingResolver::new(config.model_dir())),
        Box::new(engine::PiperVoiceEngine::new(
            config.piper_path(),
            config.voice.speaker_id,
        )),
        output::default_output(),
    )
}
