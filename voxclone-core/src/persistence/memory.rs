use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::records::{SpeechRecord, VoiceCloneRecord};
use super::store::{newest_first_clones, newest_first_speeches, CloneStore};
use crate::error::VoiceError;
use crate::voice::VoiceId;

#[derive(Default)]
struct MemoryState {
    clones: Vec<VoiceCloneRecord>,
    speeches: Vec<SpeechRecord>,
    save_clone_calls: Vec<(String, VoiceId, String)>,
    save_speech_calls: usize,
    fail_writes: bool,
    fail_reads: bool,
}

/// In-process store. Cloning shares the underlying data; useful for tests
/// and for embedding without a data directory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `PersistenceError`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Make every subsequent list call fail with `PersistenceError`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// `(name, voice_id, user_id)` for every `save_clone` call, successful or not.
    pub fn save_clone_calls(&self) -> Vec<(String, VoiceId, String)> {
        self.state.lock().unwrap().save_clone_calls.clone()
    }

    pub fn save_speech_calls(&self) -> usize {
        self.state.lock().unwrap().save_speech_calls
    }

    /// Insert an existing record as-is.
    pub fn insert_clone(&self, record: VoiceCloneRecord) {
        self.state.lock().unwrap().clones.push(record);
    }
}

#[async_trait]
impl CloneStore for MemoryStore {
    async fn save_clone(
        &self,
        name: &str,
        voice_id: &VoiceId,
        user_id: &str,
    ) -> Result<VoiceCloneRecord, VoiceError> {
        let mut state = self.state.lock().unwrap();
        state
            .save_clone_calls
            .push((name.to_string(), voice_id.clone(), user_id.to_string()));
        if state.fail_writes {
            return Err(VoiceError::PersistenceError("write rejected".to_string()));
        }
        let record = VoiceCloneRecord::new(name.to_string(), voice_id.clone(), user_id.to_string());
        state.clones.push(record.clone());
        Ok(record)
    }

    async fn list_clones(&self, user_id: &str) -> Result<Vec<VoiceCloneRecord>, VoiceError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(VoiceError::PersistenceError("read rejected".to_string()));
        }
        let mut clones: Vec<_> = state
            .clones
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        newest_first_clones(&mut clones);
        Ok(clones)
    }

    async fn save_speech(
        &self,
        clone_record_id: &str,
        text: &str,
    ) -> Result<SpeechRecord, VoiceError> {
        let mut state = self.state.lock().unwrap();
        state.save_speech_calls += 1;
        if state.fail_writes {
            return Err(VoiceError::PersistenceError("write rejected".to_string()));
        }
        let record = SpeechRecord::new(clone_record_id.to_string(), text.to_string());
        state.speeches.push(record.clone());
        Ok(record)
    }

    async fn list_speeches(
        &self,
        clone_record_id: &str,
    ) -> Result<Vec<SpeechRecord>, VoiceError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(VoiceError::PersistenceError("read rejected".to_string()));
        }
        let mut speeches: Vec<_> = state
            .speeches
            .iter()
            .filter(|s| s.voice_clone_id == clone_record_id)
            .cloned()
            .collect();
        newest_first_speeches(&mut speeches);
        Ok(speeches)
    }
}
