//! Microphone capture using cpal. Records at the device's native rate, mixed
//! down to mono.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::recorder::{CaptureDevice, CaptureStream};
use crate::error::VoiceError;

/// The host's default input device.
#[derive(Default)]
pub struct MicrophoneDevice;

impl MicrophoneDevice {
    pub fn new() -> Self {
        Self
    }
}

/// Keeps the cpal stream alive; dropping it stops the device.
struct StreamGuard {
    _stream: cpal::Stream,
    running: Arc<AtomicBool>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl CaptureDevice for MicrophoneDevice {
    fn open(&mut self) -> Result<CaptureStream, VoiceError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| VoiceError::DeviceUnavailable("no input device available".into()))?;

        let supported_config = device.default_input_config().map_err(|e| {
            VoiceError::DeviceUnavailable(format!("failed to get default input config: {e}"))
        })?;

        tracing::debug!(
            device_name = ?device.name(),
            native_sample_rate = supported_config.sample_rate().0,
            native_channels = supported_config.channels(),
            native_format = ?supported_config.sample_format(),
            "microphone opened"
        );

        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.clone().into();
        let (tx, rx) = mpsc::unbounded_channel::<Vec<i16>>();
        let running = Arc::new(AtomicBool::new(true));

        let stream = match supported_config.sample_format() {
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, tx, running.clone(), channels)?
            }
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, tx, running.clone(), channels)?
            }
            format => {
                return Err(VoiceError::DeviceUnavailable(format!(
                    "unsupported sample format: {format:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| VoiceError::DeviceUnavailable(format!("failed to start stream: {e}")))?;

        Ok(CaptureStream::new(
            sample_rate,
            rx,
            Box::new(StreamGuard {
                _stream: stream,
                running,
            }),
        ))
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    tx: mpsc::UnboundedSender<Vec<i16>>,
    running: Arc<AtomicBool>,
    channels: usize,
) -> Result<cpal::Stream, VoiceError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let err_running = running.clone();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !running.load(Ordering::SeqCst) {
                    return;
                }
                let mono = to_mono_i16(data, channels);
                if !mono.is_empty() && tx.send(mono).is_err() {
                    running.store(false, Ordering::SeqCst);
                }
            },
            move |err| {
                tracing::error!(error = ?err, "microphone stream error");
                err_running.store(false, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| VoiceError::DeviceUnavailable(format!("failed to build input stream: {e}")))
}

fn to_mono_i16<T>(samples: &[T], channels: usize) -> Vec<i16>
where
    T: Copy,
    f32: FromSample<T>,
{
    let channels = channels.max(1);
    samples
        .chunks(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().map(|&s| f32::from_sample(s)).sum();
            let mixed = (sum / channels as f32).clamp(-1.0, 1.0);
            i16::from_sample(mixed)
        })
        .collect()
}
