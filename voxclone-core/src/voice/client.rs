use std::sync::Arc;
use tracing::{info, warn};

use super::provider::VoiceCloneProvider;
use super::types::{CloneRequest, VoiceId};
use crate::capture::AudioCapture;
use crate::error::VoiceError;
use crate::settings::CloneSettings;

/// Validates samples and submits them to the provider. Never retries.
#[derive(Clone)]
pub struct CloneClient {
    provider: Arc<dyn VoiceCloneProvider>,
    settings: CloneSettings,
}

impl CloneClient {
    pub fn new(provider: Arc<dyn VoiceCloneProvider>, settings: CloneSettings) -> Self {
        Self { provider, settings }
    }

    pub fn min_audio_bytes(&self) -> usize {
        self.settings.min_audio_bytes
    }

    /// Reject samples the provider is known to refuse, without a network call.
    pub fn validate(&self, audio: &AudioCapture) -> Result<(), VoiceError> {
        if audio.len() < self.settings.min_audio_bytes {
            return Err(VoiceError::AudioTooShort {
                actual: audio.len(),
                minimum: self.settings.min_audio_bytes,
            });
        }
        Ok(())
    }

    pub async fn submit_clone(
        &self,
        audio: &AudioCapture,
        name: &str,
    ) -> Result<VoiceId, VoiceError> {
        self.validate(audio)?;

        let request = CloneRequest {
            audio: audio.clone(),
            name: name.to_string(),
            description: format!("Voice clone of {name}"),
            mode: self.settings.mode,
            language: self.settings.language.clone(),
            enhance: self.settings.enhance,
        };

        match self.provider.clone_voice(request).await {
            Ok(id) => {
                info!(voice_id = %id, provider = self.provider.name(), "clone submitted");
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, provider = self.provider.name(), "clone submission failed");
                Err(e)
            }
        }
    }
}
