use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::VoiceError;
use crate::settings::SpeechSettings;
use crate::voice::types::SpeechRequest;
use crate::voice::{SpeechAudio, VoiceCloneProvider, VoiceId};

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSpeech {
    pub audio: SpeechAudio,
    /// The text actually sent to the provider
    pub text: String,
    /// True when the input was cut down to the character limit
    pub truncated: bool,
}

/// Cut `text` to at most `max_chars` characters. Returns the text and
/// whether anything was removed.
pub fn truncate_text(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (text[..byte_index].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Turns text into audio in a cloned voice.
#[derive(Clone)]
pub struct SpeechGenerator {
    provider: Arc<dyn VoiceCloneProvider>,
    settings: SpeechSettings,
}

impl SpeechGenerator {
    pub fn new(provider: Arc<dyn VoiceCloneProvider>, settings: SpeechSettings) -> Self {
        Self { provider, settings }
    }

    pub fn max_text_chars(&self) -> usize {
        self.settings.max_text_chars
    }

    pub async fn generate(
        &self,
        voice_id: &VoiceId,
        text: &str,
    ) -> Result<GeneratedSpeech, VoiceError> {
        let (text, truncated) = truncate_text(text, self.settings.max_text_chars);
        // Checked after truncation: the kept prefix may be all whitespace.
        if text.trim().is_empty() {
            return Err(VoiceError::EmptyInput);
        }
        if truncated {
            debug!(
                max_chars = self.settings.max_text_chars,
                "speech text truncated"
            );
        }

        let request = SpeechRequest {
            model_id: self.settings.model_id.clone(),
            transcript: text.clone(),
            voice_id: voice_id.clone(),
            language: self.settings.language.clone(),
            output_format: self.settings.output_format.clone(),
        };

        let data = self.provider.synthesize(request).await.map_err(|e| {
            warn!(voice_id = %voice_id, error = %e, "speech generation failed");
            match e {
                e @ VoiceError::RemoteError { .. } => e,
                other => VoiceError::remote(other.status(), other.to_string()),
            }
        })?;

        Ok(GeneratedSpeech {
            audio: SpeechAudio {
                data,
                format: self.settings.output_format.clone(),
            },
            text,
            truncated,
        })
    }
}
