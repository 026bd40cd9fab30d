use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

use crate::capture::AudioCapture;

/// Opaque identifier issued by the voice provider for a clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceId(String);

impl VoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the provider trades fidelity for robustness when cloning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CloneMode {
    Similarity,
    #[default]
    Stability,
}

#[derive(Debug, Clone)]
pub struct CloneRequest {
    pub audio: AudioCapture,
    pub name: String,
    pub description: String,
    pub mode: CloneMode,
    pub language: String,
    pub enhance: bool,
}

/// What the provider reports for a clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Ready,
    Processing,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub container: String,
    pub sample_rate: u32,
    pub encoding: String,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            container: "wav".to_string(),
            sample_rate: 44_100,
            encoding: "pcm_f32le".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub model_id: String,
    pub transcript: String,
    pub voice_id: VoiceId,
    pub language: String,
    pub output_format: OutputFormat,
}

/// Synthesized audio as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechAudio {
    pub data: Vec<u8>,
    pub format: OutputFormat,
}

impl SpeechAudio {
    pub fn mime_type(&self) -> String {
        format!("audio/{}", self.format.container)
    }
}
