use async_trait::async_trait;

use super::records::{SpeechRecord, VoiceCloneRecord};
use crate::error::VoiceError;
use crate::voice::VoiceId;

/// Storage for clone metadata and generated-speech history.
///
/// Callers must only reach a store on behalf of an authenticated identity;
/// the store itself trusts the ids it is given. Listings are newest first.
#[async_trait]
pub trait CloneStore: Send + Sync {
    async fn save_clone(
        &self,
        name: &str,
        voice_id: &VoiceId,
        user_id: &str,
    ) -> Result<VoiceCloneRecord, VoiceError>;

    async fn list_clones(&self, user_id: &str) -> Result<Vec<VoiceCloneRecord>, VoiceError>;

    async fn save_speech(
        &self,
        clone_record_id: &str,
        text: &str,
    ) -> Result<SpeechRecord, VoiceError>;

    async fn list_speeches(&self, clone_record_id: &str)
        -> Result<Vec<SpeechRecord>, VoiceError>;
}

pub(crate) fn newest_first_clones(records: &mut [VoiceCloneRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

pub(crate) fn newest_first_speeches(records: &mut [SpeechRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
