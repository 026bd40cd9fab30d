use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::voice::VoiceId;

/// A voice clone saved for a signed-in user. `id` is ours; `voice_id` is
/// the provider's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceCloneRecord {
    pub id: String,
    pub name: String,
    pub voice_id: VoiceId,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl VoiceCloneRecord {
    pub fn new(name: String, voice_id: VoiceId, user_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            voice_id,
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// Text of one generated utterance. The audio itself is not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRecord {
    pub id: String,
    pub voice_clone_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl SpeechRecord {
    pub fn new(voice_clone_id: String, text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            voice_clone_id,
            text,
            created_at: Utc::now(),
        }
    }
}
