//! Audio capture: microphone recording and file uploads both end in a single
//! immutable [`AudioCapture`].

#[cfg(feature = "audio")]
pub mod microphone;
pub mod recorder;

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::VoiceError;

pub use recorder::{CaptureDevice, CaptureStream, Recorder};

pub const WAV_MIME: &str = "audio/wav";

/// Recordings shorter than this still clone, but the result tends to be poor.
pub const RECOMMENDED_SAMPLE_SECS: u64 = 30;

/// A finished recording or uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCapture {
    data: Vec<u8>,
    mime_type: String,
}

impl AudioCapture {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Build a capture from raw bytes, detecting the container from magic bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime_type = detect_mime_type(&data);
        Self::new(data, mime_type)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the mime type, used for multipart uploads.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "audio/wav" => "wav",
            "audio/mpeg" => "mp3",
            "audio/ogg" => "ogg",
            "audio/flac" => "flac",
            "audio/webm" => "webm",
            _ => "bin",
        }
    }

    /// Playback length. Only WAV payloads can be measured; anything else
    /// returns `None`.
    pub fn duration(&self) -> Option<Duration> {
        if self.mime_type != WAV_MIME {
            return None;
        }
        let reader = hound::WavReader::new(Cursor::new(&self.data)).ok()?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return None;
        }
        let frames = reader.duration() as f64;
        Some(Duration::from_secs_f64(frames / spec.sample_rate as f64))
    }

    /// True when the capture is measurably shorter than the recommended length.
    pub fn is_shorter_than_recommended(&self) -> bool {
        self.duration()
            .is_some_and(|d| d < Duration::from_secs(RECOMMENDED_SAMPLE_SECS))
    }
}

/// Load an uploaded file's bytes without touching any device.
pub fn load_from_file(bytes: Vec<u8>) -> Result<AudioCapture, VoiceError> {
    if bytes.is_empty() {
        return Err(VoiceError::MissingAudio);
    }
    Ok(AudioCapture::from_bytes(bytes))
}

pub fn load_from_path(path: &Path) -> Result<AudioCapture> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read audio file {path:?}"))?;
    load_from_file(bytes).with_context(|| format!("Audio file {path:?} is empty"))
}

fn detect_mime_type(data: &[u8]) -> &'static str {
    let mpeg_frame_sync = data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0;
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
        "audio/wav"
    } else if data.starts_with(b"ID3") || mpeg_frame_sync {
        "audio/mpeg"
    } else if data.starts_with(b"OggS") {
        "audio/ogg"
    } else if data.starts_with(b"fLaC") {
        "audio/flac"
    } else if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        "audio/webm"
    } else {
        "application/octet-stream"
    }
}

/// Encode mono 16-bit PCM samples as a WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, VoiceError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| VoiceError::InvalidState(format!("failed to start WAV encoding: {e}")))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| VoiceError::InvalidState(format!("failed to encode sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| VoiceError::InvalidState(format!("failed to finish WAV encoding: {e}")))?;
    }
    Ok(cursor.into_inner())
}

/// Format a duration as `m:ss`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_wav_and_measures_duration() {
        let samples = vec![0i16; 16_000 * 2];
        let wav = encode_wav(&samples, 16_000).unwrap();
        let capture = AudioCapture::from_bytes(wav);

        assert_eq!(capture.mime_type(), WAV_MIME);
        assert_eq!(capture.extension(), "wav");
        assert_eq!(capture.duration(), Some(Duration::from_secs(2)));
        assert!(capture.is_shorter_than_recommended());
    }

    #[test]
    fn unknown_bytes_have_no_duration() {
        let capture = AudioCapture::from_bytes(vec![1, 2, 3, 4]);
        assert_eq!(capture.mime_type(), "application/octet-stream");
        assert_eq!(capture.duration(), None);
        assert!(!capture.is_shorter_than_recommended());
    }

    #[test]
    fn detects_other_containers() {
        assert_eq!(detect_mime_type(b"OggS\0\0"), "audio/ogg");
        assert_eq!(detect_mime_type(b"fLaC\0\0"), "audio/flac");
        assert_eq!(detect_mime_type(b"ID3\x04"), "audio/mpeg");
        assert_eq!(detect_mime_type(&[0xFF, 0xFB, 0x90, 0x64]), "audio/mpeg");
        assert_eq!(detect_mime_type(&[0xFF]), "application/octet-stream");
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert_eq!(load_from_file(Vec::new()), Err(VoiceError::MissingAudio));
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_duration(Duration::from_secs(31)), "0:31");
        assert_eq!(format_duration(Duration::from_secs(125)), "2:05");
    }
}
