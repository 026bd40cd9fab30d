use std::any::Any;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{encode_wav, AudioCapture, WAV_MIME};
use crate::error::VoiceError;

/// A source of live audio, e.g. the default microphone.
pub trait CaptureDevice {
    /// Acquire the device and begin streaming mono 16-bit samples.
    fn open(&mut self) -> Result<CaptureStream, VoiceError>;
}

/// An acquired device streaming samples. The device is held for as long as
/// the guard lives.
pub struct CaptureStream {
    pub sample_rate: u32,
    receiver: mpsc::UnboundedReceiver<Vec<i16>>,
    guard: Box<dyn Any>,
}

impl CaptureStream {
    pub fn new(
        sample_rate: u32,
        receiver: mpsc::UnboundedReceiver<Vec<i16>>,
        guard: Box<dyn Any>,
    ) -> Self {
        Self {
            sample_rate,
            receiver,
            guard,
        }
    }

    /// Release the device, then collect whatever was buffered before release.
    fn finish(self) -> (u32, Vec<i16>) {
        let Self {
            sample_rate,
            mut receiver,
            guard,
        } = self;
        drop(guard);

        let mut samples = Vec::new();
        while let Ok(chunk) = receiver.try_recv() {
            samples.extend(chunk);
        }
        (sample_rate, samples)
    }
}

/// Records one session at a time from a [`CaptureDevice`].
pub struct Recorder<D: CaptureDevice> {
    device: D,
    active: Option<CaptureStream>,
}

impl<D: CaptureDevice> Recorder<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn start_capture(&mut self) -> Result<(), VoiceError> {
        if self.active.is_some() {
            return Err(VoiceError::InvalidState(
                "a recording is already in progress".to_string(),
            ));
        }

        let stream = self.device.open().inspect_err(|e| {
            warn!(error = %e, "failed to acquire capture device");
        })?;
        info!(sample_rate = stream.sample_rate, "recording started");
        self.active = Some(stream);
        Ok(())
    }

    /// Stop recording and produce the finished WAV capture. The device is
    /// released before anything else happens, including on error.
    pub fn stop_capture(&mut self) -> Result<AudioCapture, VoiceError> {
        let stream = self
            .active
            .take()
            .ok_or_else(|| VoiceError::InvalidState("no recording in progress".to_string()))?;

        let (sample_rate, samples) = stream.finish();
        debug!(samples = samples.len(), sample_rate, "recording stopped");

        if samples.is_empty() {
            return Err(VoiceError::MissingAudio);
        }

        let wav = encode_wav(&samples, sample_rate)?;
        Ok(AudioCapture::new(wav, WAV_MIME))
    }

    /// Drop the current recording, releasing the device.
    pub fn cancel(&mut self) {
        if let Some(stream) = self.active.take() {
            drop(stream.finish());
            info!("recording cancelled");
        }
    }
}

impl<D: CaptureDevice> Drop for Recorder<D> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ReleaseFlag(Arc<AtomicBool>);

    impl Drop for ReleaseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Emits a fixed number of samples as soon as it is opened.
    struct ScriptedDevice {
        samples: usize,
        released: Arc<AtomicBool>,
        opens: Arc<AtomicUsize>,
    }

    impl ScriptedDevice {
        fn new(samples: usize) -> Self {
            Self {
                samples,
                released: Arc::new(AtomicBool::new(false)),
                opens: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CaptureDevice for ScriptedDevice {
        fn open(&mut self) -> Result<CaptureStream, VoiceError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.released.store(false, Ordering::SeqCst);
            let (tx, rx) = mpsc::unbounded_channel();
            for chunk in vec![100i16; self.samples].chunks(1024) {
                tx.send(chunk.to_vec()).unwrap();
            }
            Ok(CaptureStream::new(
                8_000,
                rx,
                Box::new(ReleaseFlag(self.released.clone())),
            ))
        }
    }

    struct UnavailableDevice;

    impl CaptureDevice for UnavailableDevice {
        fn open(&mut self) -> Result<CaptureStream, VoiceError> {
            Err(VoiceError::DeviceUnavailable(
                "permission denied".to_string(),
            ))
        }
    }

    #[test]
    fn stop_yields_wav_and_releases_device() {
        let device = ScriptedDevice::new(8_000 * 3);
        let released = device.released.clone();
        let mut recorder = Recorder::new(device);

        recorder.start_capture().unwrap();
        assert!(recorder.is_recording());
        assert!(!released.load(Ordering::SeqCst));

        let capture = recorder.stop_capture().unwrap();
        assert!(released.load(Ordering::SeqCst));
        assert!(!recorder.is_recording());
        assert_eq!(capture.mime_type(), WAV_MIME);
        assert_eq!(capture.duration(), Some(std::time::Duration::from_secs(3)));
    }

    #[test]
    fn empty_recording_still_releases_device() {
        let device = ScriptedDevice::new(0);
        let released = device.released.clone();
        let mut recorder = Recorder::new(device);

        recorder.start_capture().unwrap();
        assert_eq!(recorder.stop_capture(), Err(VoiceError::MissingAudio));
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn unavailable_device_leaves_no_session() {
        let mut recorder = Recorder::new(UnavailableDevice);
        let err = recorder.start_capture().unwrap_err();
        assert!(matches!(err, VoiceError::DeviceUnavailable(_)));
        assert!(!recorder.is_recording());
        assert!(recorder.stop_capture().is_err());
    }

    #[test]
    fn double_start_is_rejected() {
        let device = ScriptedDevice::new(10);
        let opens = device.opens.clone();
        let mut recorder = Recorder::new(device);

        recorder.start_capture().unwrap();
        assert!(matches!(
            recorder.start_capture(),
            Err(VoiceError::InvalidState(_))
        ));
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_recorder_releases_device() {
        let device = ScriptedDevice::new(10);
        let released = device.released.clone();
        let mut recorder = Recorder::new(device);
        recorder.start_capture().unwrap();
        drop(recorder);
        assert!(released.load(Ordering::SeqCst));
    }
}
