use async_trait::async_trait;

use super::types::{CloneRequest, RemoteStatus, SpeechRequest, VoiceId};
use crate::error::VoiceError;

/// Trait for remote voice-cloning / text-to-speech services
#[async_trait]
pub trait VoiceCloneProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upload a sample and start cloning. Returns the provider's id for the clone.
    async fn clone_voice(&self, request: CloneRequest) -> Result<VoiceId, VoiceError>;

    /// Query a clone's readiness. Transport and lookup failures are folded
    /// into the returned status rather than raised.
    async fn voice_status(&self, voice_id: &VoiceId) -> RemoteStatus;

    /// Synthesize speech in a cloned voice.
    async fn synthesize(&self, request: SpeechRequest) -> Result<Vec<u8>, VoiceError>;
}
