//! Speaker playback of generated speech.
//!
//! [`PlaybackProgress`] and [`decode_wav`] are always available; the cpal
//! output stream needs the `audio` feature.

use anyhow::{Context, Result};
use std::io::Cursor;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Percent of the current clip played so far, shared with the audio thread.
/// Returns to 0 when playback finishes.
#[derive(Debug, Clone, Default)]
pub struct PlaybackProgress {
    percent: Arc<AtomicU8>,
}

impl PlaybackProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, position: usize, total: usize) {
        let percent = if total == 0 {
            0
        } else {
            (position.min(total) * 100 / total) as u8
        };
        self.percent.store(percent, Ordering::SeqCst);
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::SeqCst)
    }

    pub fn finish(&self) {
        self.percent.store(0, Ordering::SeqCst);
    }
}

/// Mono samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode a WAV payload (16-bit int or 32-bit float), mixing down to mono.
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).context("not a WAV payload")?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("failed to read float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("failed to read integer samples")?
        }
    };

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(feature = "audio")]
pub use device::{AudioPlayback, AudioPlayer};

#[cfg(feature = "audio")]
mod device {
    use anyhow::{Context, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{
        Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedStreamConfig,
    };
    use rubato::{FftFixedIn, Resampler};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{decode_wav, PlaybackProgress};

    /// Plays WAV speech on the default output device.
    pub struct AudioPlayer {
        device: Device,
        supported_config: SupportedStreamConfig,
    }

    /// Dropping stops playback.
    pub struct AudioPlayback {
        _stream: Stream,
        finished: Arc<AtomicBool>,
        progress: PlaybackProgress,
    }

    impl AudioPlayback {
        pub fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }

        pub fn progress(&self) -> &PlaybackProgress {
            &self.progress
        }

        pub async fn wait(&self) {
            while !self.is_finished() {
                tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            }
            self.progress.finish();
        }
    }

    impl Drop for AudioPlayback {
        fn drop(&mut self) {
            self.progress.finish();
        }
    }

    impl AudioPlayer {
        pub fn new() -> Result<Self> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .context("no output device available")?;

            let supported_config = device
                .default_output_config()
                .context("failed to get default output config")?;

            Ok(Self {
                device,
                supported_config,
            })
        }

        pub fn play(&self, wav: &[u8], progress: PlaybackProgress) -> Result<AudioPlayback> {
            let native_rate = self.supported_config.sample_rate().0;
            let native_channels = self.supported_config.channels() as usize;
            let sample_format = self.supported_config.sample_format();
            let config: StreamConfig = self.supported_config.clone().into();

            let decoded = decode_wav(wav)?;
            let resampled = if decoded.sample_rate == native_rate {
                decoded.samples
            } else {
                resample(&decoded.samples, decoded.sample_rate, native_rate)?
            };
            let samples = if native_channels > 1 {
                expand_to_channels(&resampled, native_channels)
            } else {
                resampled
            };

            let samples = Arc::new(samples);
            let finished = Arc::new(AtomicBool::new(false));
            progress.update(0, samples.len());

            let stream = match sample_format {
                SampleFormat::F32 => {
                    self.build_stream::<f32>(&config, samples, progress.clone(), finished.clone())?
                }
                SampleFormat::I16 => {
                    self.build_stream::<i16>(&config, samples, progress.clone(), finished.clone())?
                }
                format => anyhow::bail!("unsupported sample format: {:?}", format),
            };

            stream.play().context("failed to start playback stream")?;
            tracing::debug!(native_rate, native_channels, "playback started");

            Ok(AudioPlayback {
                _stream: stream,
                finished,
                progress,
            })
        }

        fn build_stream<T>(
            &self,
            config: &StreamConfig,
            samples: Arc<Vec<f32>>,
            progress: PlaybackProgress,
            finished: Arc<AtomicBool>,
        ) -> Result<Stream>
        where
            T: SizedSample + FromSample<f32> + Default + Send + 'static,
        {
            let position = AtomicUsize::new(0);
            self.device
                .build_output_stream(
                    config,
                    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                        let pos = position.load(Ordering::SeqCst);
                        let remaining = samples.len().saturating_sub(pos);

                        if remaining == 0 {
                            data.fill(T::default());
                            finished.store(true, Ordering::SeqCst);
                            return;
                        }

                        let to_copy = remaining.min(data.len());
                        for (slot, &sample) in data.iter_mut().zip(&samples[pos..pos + to_copy]) {
                            *slot = T::from_sample(sample);
                        }
                        if to_copy < data.len() {
                            data[to_copy..].fill(T::default());
                        }

                        position.store(pos + to_copy, Ordering::SeqCst);
                        progress.update(pos + to_copy, samples.len());
                    },
                    move |err| {
                        tracing::error!(error = ?err, "playback stream error");
                    },
                    None,
                )
                .context("failed to build output stream")
        }
    }

    fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
        let chunk_size = 1024;
        let mut resampler =
            FftFixedIn::<f32>::new(source_rate as usize, target_rate as usize, chunk_size, 2, 1)
                .context("failed to create resampler")?;

        let mut output = Vec::new();
        let mut pos = 0;
        while pos < samples.len() {
            let frames_needed = resampler.input_frames_next();
            let end = (pos + frames_needed).min(samples.len());

            let mut chunk = samples[pos..end].to_vec();
            chunk.resize(frames_needed, 0.0);

            let resampled = resampler
                .process(&[chunk], None)
                .map_err(|e| anyhow::anyhow!("resampling failed: {e:?}"))?;
            if let Some(channel) = resampled.into_iter().next() {
                output.extend(channel);
            }
            pos = end;
        }
        Ok(output)
    }

    fn expand_to_channels(samples: &[f32], channels: usize) -> Vec<f32> {
        samples
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(channels))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_f32(samples: &[f32], channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn progress_tracks_and_resets() {
        let progress = PlaybackProgress::new();
        let shared = progress.clone();

        progress.update(50, 200);
        assert_eq!(shared.percent(), 25);
        progress.update(500, 200);
        assert_eq!(shared.percent(), 100);

        progress.finish();
        assert_eq!(shared.percent(), 0);
        progress.update(1, 0);
        assert_eq!(shared.percent(), 0);
    }

    #[test]
    fn decodes_float_wav_to_mono() {
        let decoded = decode_wav(&wav_f32(&[0.5, -0.5, 1.0, 0.0], 2)).unwrap();
        assert_eq!(decoded.sample_rate, 44_100);
        assert_eq!(decoded.samples, vec![0.0, 0.5]);
    }

    #[test]
    fn decodes_int_wav() {
        let bytes = crate::capture::encode_wav(&[16_384, -16_384], 16_000).unwrap();
        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.samples, vec![0.5, -0.5]);
    }

    #[test]
    fn rejects_non_wav() {
        assert!(decode_wav(b"RIFF mock audio").is_err());
    }
}
