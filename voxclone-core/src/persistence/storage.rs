use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::records::{SpeechRecord, VoiceCloneRecord};
use super::store::{newest_first_clones, newest_first_speeches, CloneStore};
use crate::error::VoiceError;
use crate::voice::VoiceId;

const CLONES_DIR: &str = "voice_clones";
const SPEECHES_DIR: &str = "generated_speeches";

/// Stores each record as a pretty-printed JSON file:
/// `<root>/voice_clones/<id>.json` and `<root>/generated_speeches/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, name: &str) -> Result<PathBuf, VoiceError> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).map_err(|e| {
            VoiceError::PersistenceError(format!("failed to create {dir:?}: {e}"))
        })?;
        Ok(dir)
    }
}

fn write_record<T: Serialize>(dir: &Path, id: &str, record: &T) -> Result<(), VoiceError> {
    let file_path = dir.join(format!("{id}.json"));
    let json = serde_json::to_string_pretty(record)?;
    fs::write(&file_path, json).map_err(|e| {
        VoiceError::PersistenceError(format!("failed to write {file_path:?}: {e}"))
    })
}

/// Read every record in `dir` that passes `keep`. Unreadable files are skipped.
fn read_records<T, F>(dir: &Path, keep: F) -> Result<Vec<T>, VoiceError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let entries = fs::read_dir(dir)
        .map_err(|e| VoiceError::PersistenceError(format!("failed to read {dir:?}: {e}")))?;

    let mut records = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }

        let json = match fs::read_to_string(&path) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!("Skipping unreadable record file {:?}: {}", path, e);
                continue;
            }
        };

        let record: T = match serde_json::from_str(&json) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping unparseable record file {:?}: {}", path, e);
                continue;
            }
        };

        if keep(&record) {
            records.push(record);
        }
    }
    Ok(records)
}

#[async_trait]
impl CloneStore for JsonFileStore {
    async fn save_clone(
        &self,
        name: &str,
        voice_id: &VoiceId,
        user_id: &str,
    ) -> Result<VoiceCloneRecord, VoiceError> {
        let record = VoiceCloneRecord::new(name.to_string(), voice_id.clone(), user_id.to_string());
        write_record(&self.dir(CLONES_DIR)?, &record.id, &record)?;
        tracing::info!(record_id = %record.id, voice_id = %voice_id, "voice clone saved");
        Ok(record)
    }

    async fn list_clones(&self, user_id: &str) -> Result<Vec<VoiceCloneRecord>, VoiceError> {
        let mut clones = read_records(&self.dir(CLONES_DIR)?, |r: &VoiceCloneRecord| {
            r.user_id == user_id
        })?;
        newest_first_clones(&mut clones);
        Ok(clones)
    }

    async fn save_speech(
        &self,
        clone_record_id: &str,
        text: &str,
    ) -> Result<SpeechRecord, VoiceError> {
        let record = SpeechRecord::new(clone_record_id.to_string(), text.to_string());
        write_record(&self.dir(SPEECHES_DIR)?, &record.id, &record)?;
        Ok(record)
    }

    async fn list_speeches(
        &self,
        clone_record_id: &str,
    ) -> Result<Vec<SpeechRecord>, VoiceError> {
        let mut speeches = read_records(&self.dir(SPEECHES_DIR)?, |r: &SpeechRecord| {
            r.voice_clone_id == clone_record_id
        })?;
        newest_first_speeches(&mut speeches);
        Ok(speeches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn clones_are_scoped_to_user_and_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        let first = store
            .save_clone("First", &VoiceId::new("v1"), "alice")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store
            .save_clone("Second", &VoiceId::new("v2"), "alice")
            .await
            .unwrap();
        store
            .save_clone("Other", &VoiceId::new("v3"), "bob")
            .await
            .unwrap();

        let clones = store.list_clones("alice").await.unwrap();
        assert_eq!(
            clones.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec![second.id.as_str(), first.id.as_str()]
        );
        assert_ne!(first.id, first.voice_id.as_str());
    }

    #[tokio::test]
    async fn speeches_are_listed_per_clone() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        store.save_speech("clone-a", "Hello").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.save_speech("clone-a", "World").await.unwrap();
        store.save_speech("clone-b", "Elsewhere").await.unwrap();

        let speeches = store.list_speeches("clone-a").await.unwrap();
        let texts: Vec<_> = speeches.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["World", "Hello"]);
    }

    #[tokio::test]
    async fn corrupt_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());
        store
            .save_clone("Good", &VoiceId::new("v1"), "alice")
            .await
            .unwrap();
        fs::write(temp_dir.path().join(CLONES_DIR).join("bad.json"), "{nope").unwrap();

        let clones = store.list_clones("alice").await.unwrap();
        assert_eq!(clones.len(), 1);
        assert_eq!(clones[0].name, "Good");
    }
}
