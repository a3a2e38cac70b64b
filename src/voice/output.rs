//! Audio output. The real device path uses cpal behind the `audio`
//! feature; default builds get an output that refuses to open, which
//! the pipeline reports as a stream-init failure.

use crate::voice::error::VoiceError;

/// A device that can open playback streams.
pub trait AudioOutput: Send + Sync {
    /// Open a mono 16-bit stream at the given rate. The returned sink
    /// holds the device; dropping it releases the stream.
    fn open(&self, sample_rate: u32) -> Result<Box<dyn AudioSink>, VoiceError>;
}

/// An open playback stream. Not `Send`: a sink lives and dies on the
/// thread that opened it.
pub trait AudioSink {
    /// Queue samples for playback.
    fn write(&mut self, samples: &[i16]) -> Result<(), VoiceError>;

    /// Block until everything queued has played out.
    fn drain(&mut self) -> Result<(), VoiceError>;
}

/// The output for this build: cpal when compiled with `--features audio`,
/// otherwise a stub that fails at open time.
pub fn default_output() -> Box<dyn AudioOutput> {
    #[cfg(feature = "audio")]
    {
        Box::new(cpal_backend::CpalOutput)
    }
    #[cfg(not(feature = "audio"))]
    {
        Box::new(DisabledOutput)
    }
}

/// Stands in for the device layer when audio support is compiled out.
#[cfg(not(feature = "audio"))]
struct DisabledOutput;

#[cfg(not(feature = "audio"))]
impl AudioOutput for DisabledOutput {
    fn open(&self, _sample_rate: u32) -> Result<Box<dyn AudioSink>, VoiceError> {
        Err(VoiceError::StreamInit(
            "built without audio support (enable the `audio` feature)".into(),
        ))
    }
}

#[cfg(feature = "audio")]
mod cpal_backend {
    use super::{AudioOutput, AudioSink};
    use crate::voice::error::VoiceError;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    /// Cap on queued samples; writers back off above this so a fast
    /// synthesizer cannot balloon memory.
    const QUEUE_CAP: usize = 1 << 18;

    pub struct CpalOutput;

    impl AudioOutput for CpalOutput {
        fn open(&self, sample_rate: u32) -> Result<Box<dyn AudioSink>, VoiceError> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| VoiceError::StreamInit("no output device".into()))?;

            let queue: Arc<Mutex<VecDeque<i16>>> = Arc::new(Mutex::new(VecDeque::new()));
            let callback_queue = queue.clone();

            let config = cpal::StreamConfig {
                channels: 1,
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let stream = device
                .build_output_stream(
                    &config,
                    move |out: &mut [i16], _| {
                        let mut queue = callback_queue.lock();
                        for sample in out.iter_mut() {
                            *sample = queue.pop_front().unwrap_or(0);
                        }
                    },
                    |e| tracing::warn!("Audio stream error: {e}"),
                    None,
                )
                .map_err(|e| VoiceError::StreamInit(e.to_string()))?;
            stream
                .play()
                .map_err(|e| VoiceError::StreamInit(e.to_string()))?;

            Ok(Box::new(CpalSink {
                _stream: stream,
                queue,
            }))
        }
    }

    struct CpalSink {
        _stream: cpal::Stream,
        queue: Arc<Mutex<VecDeque<i16>>>,
    }

    impl AudioSink for CpalSink {
        fn write(&mut self, samples: &[i16]) -> Result<(), VoiceError> {
            while self.queue.lock().len() > QUEUE_CAP {
                std::thread::sleep(Duration::from_millis(10));
            }
            self.queue.lock().extend(samples.iter().copied());
            Ok(())
        }

        fn drain(&mut self) -> Result<(), VoiceError> {
            while !self.queue.lock().is_empty() {
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(())
        }
    }
}

/// Reinterpret raw little-endian bytes as i16 samples.
pub fn bytes_to_samples(chunk: &[u8]) -> Result<Vec<i16>, VoiceError> {
    if chunk.len() % 2 != 0 {
        return Err(VoiceError::AudioWrite(format!(
            "odd PCM chunk length {}",
            chunk.len()
        )));
    }
    Ok(chunk
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}
