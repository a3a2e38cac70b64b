//! The speak tool: text in, audio out through the speech pipeline.

use super::{require_str, Tool, ToolResult};
use crate::voice::SpeechPipeline;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub(super) struct SpeakTool {
    pipeline: Arc<SpeechPipeline>,
    default_model: Option<String>,
}

impl SpeakTool {
    pub(super) fn new(pipeline: Arc<SpeechPipeline>, default_model: Option<String>) -> Self {
        Self {
            pipeline,
            default_model,
        }
    }
}

#[async_trait]
impl Tool for SpeakTool {
    fn name(&self) -> &str {
        "base_speak"
    }

    fn description(&self) -> &str {
        "Speak text aloud through the robot's speaker. The voice model is a \
         local .onnx path or an https URL; omitted, the configured default is used."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Text to speak" },
                "model": { "type": "string", "description": "Voice model path or URL" },
                "speaker": { "type": "integer", "description": "Speaker ID for multi-speaker models" }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let text = require_str(&args, "text")?.to_string();
        let model = args
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.default_model.clone());
        let Some(model) = model else {
            return Ok(ToolResult::fail(
                "Failed to load voice model: no model given and no default configured",
            ));
        };
        let speaker = args
            .get("speaker")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok());

        // The pipeline is blocking end to end; keep it off the runtime.
        let pipeline = self.pipeline.clone();
        let outcome = tokio::task::spawn_blocking(move || pipeline.speak(&model, &text, speaker))
            .await
            .context("speech task panicked")?;

        Ok(if outcome.is_success() {
            ToolResult::ok(outcome.message())
        } else {
            ToolResult::fail(outcome.message())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::engine::{ChunkStream, LoadedVoice, VoiceEngine};
    use crate::voice::output::{AudioOutput, AudioSink};
    use crate::voice::resolver::{ModelResolver, ResolvedModel};
    use crate::voice::VoiceError;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    struct StaticResolver {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ModelResolver for StaticResolver {
        fn resolve(&self, source: &str) -> Result<ResolvedModel, VoiceError> {
            self.seen.lock().push(source.to_string());
            Ok(ResolvedModel {
                model_path: PathBuf::from("/v/x.onnx"),
                config_path: PathBuf::from("/v/x.onnx.json"),
            })
        }
    }

    struct OneChunkEngine {
        speakers: Arc<Mutex<Vec<Option<u32>>>>,
    }

    impl VoiceEngine for OneChunkEngine {
        fn load(&self, _m: &ResolvedModel) -> Result<Box<dyn LoadedVoice>, VoiceError> {
            Ok(Box::new(OneChunkVoice {
                speakers: self.speakers.clone(),
            }))
        }
    }

    struct OneChunkVoice {
        speakers: Arc<Mutex<Vec<Option<u32>>>>,
    }

    impl LoadedVoice for OneChunkVoice {
        fn sample_rate(&self) -> u32 {
            22050
        }
        fn synthesize(&self, _text: &str, speaker: Option<u32>) -> Result<ChunkStream, VoiceError> {
            self.speakers.lock().push(speaker);
            Ok(Box::new(std::iter::once(Ok(vec![0u8, 0u8]))))
        }
    }

    struct NullOutput;

    impl AudioOutput for NullOutput {
        fn open(&self, _rate: u32) -> Result<Box<dyn AudioSink>, VoiceError> {
            Ok(Box::new(NullSink))
        }
    }

    struct NullSink;

    impl AudioSink for NullSink {
        fn write(&mut self, _s: &[i16]) -> Result<(), VoiceError> {
            Ok(())
        }
        fn drain(&mut self) -> Result<(), VoiceError> {
            Ok(())
        }
    }

    struct Probes {
        models: Arc<Mutex<Vec<String>>>,
        speakers: Arc<Mutex<Vec<Option<u32>>>>,
    }

    fn tool(default_model: Option<&str>) -> (SpeakTool, Probes) {
        let models = Arc::new(Mutex::new(Vec::new()));
        let speakers = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Arc::new(SpeechPipeline::new(
            Box::new(StaticResolver {
                seen: models.clone(),
            }),
            Box::new(OneChunkEngine {
                speakers: speakers.clone(),
            }),
            Box::new(NullOutput),
        ));
        (
            SpeakTool::new(pipeline, default_model.map(str::to_string)),
            Probes { models, speakers },
        )
    }

    #[tokio::test]
    async fn explicit_model_wins_over_default() {
        let (tool, probes) = tool(Some("default.onnx"));
        let result = tool
            .execute(json!({ "text": "hi", "model": "special.onnx" }))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "Finished speaking.");
        assert_eq!(*probes.models.lock(), vec!["special.onnx".to_string()]);
    }

    #[tokio::test]
    async fn default_model_fills_in() {
        let (tool, probes) = tool(Some("default.onnx"));
        tool.execute(json!({ "text": "hi" })).await.unwrap();
        assert_eq!(*probes.models.lock(), vec!["default.onnx".to_string()]);
    }

    #[tokio::test]
    async fn speaker_argument_reaches_the_voice() {
        let (tool, probes) = tool(Some("default.onnx"));
        tool.execute(json!({ "text": "hi", "speaker": 4 }))
            .await
            .unwrap();
        tool.execute(json!({ "text": "hi" })).await.unwrap();
        assert_eq!(*probes.speakers.lock(), vec![Some(4), None]);
    }

    #[tokio::test]
    async fn speaker_is_advertised_in_the_schema() {
        let (tool, _) = tool(None);
        let schema = tool.parameters_schema();
        assert!(schema["properties"]["speaker"].is_object());
        assert!(!schema["required"]
            .as_array()
            .unwrap()
            .contains(&json!("speaker")));
    }

    #[tokio::test]
    async fn no_model_anywhere_fails_like_a_load_error() {
        let (tool, _) = tool(None);
        let result = tool.execute(json!({ "text": "hi" })).await.unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("Failed to load voice model:"));
    }

    #[tokio::test]
    async fn text_is_required() {
        let (tool, _) = tool(Some("default.onnx"));
        assert!(tool.execute(json!({})).await.is_err());
    }
}
