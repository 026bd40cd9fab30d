use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::Identity;
use crate::error::VoiceError;
use crate::persistence::{CloneStore, SpeechRecord, VoiceCloneRecord};
use crate::voice::VoiceId;

/// One saved clone and the speech generated with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneHistory {
    pub clone: VoiceCloneRecord,
    pub speeches: Vec<SpeechRecord>,
}

/// All clones saved by `identity`, newest first, each with its speech
/// records (also newest first). Fails with `Unauthorized` when nobody is
/// signed in.
pub async fn load_history(
    store: &dyn CloneStore,
    identity: Option<&Identity>,
) -> Result<Vec<CloneHistory>, VoiceError> {
    let identity = identity
        .ok_or_else(|| VoiceError::Unauthorized("sign in to view your history".to_string()))?;

    let clones = store.list_clones(&identity.id).await.map_err(|e| {
        warn!(user_id = %identity.id, error = %e, "failed to load voice clones");
        e
    })?;

    let mut history = Vec::with_capacity(clones.len());
    for clone in clones {
        let speeches = store.list_speeches(&clone.id).await?;
        history.push(CloneHistory { clone, speeches });
    }
    Ok(history)
}

/// The clone `identity` saved for `voice_id`, if any. Store failures are
/// returned rather than treated as "not saved".
pub async fn find_saved_clone(
    store: &dyn CloneStore,
    identity: &Identity,
    voice_id: &VoiceId,
) -> Result<Option<VoiceCloneRecord>, VoiceError> {
    let clones = store.list_clones(&identity.id).await.map_err(|e| {
        warn!(user_id = %identity.id, error = %e, "failed to look up saved clone");
        e
    })?;
    Ok(clones.into_iter().find(|c| &c.voice_id == voice_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn alice() -> Identity {
        Identity {
            id: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn requires_identity() {
        let store = MemoryStore::new();
        let err = load_history(&store, None).await.unwrap_err();
        assert!(matches!(err, VoiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn groups_speeches_under_their_clone() {
        let store = MemoryStore::new();
        let clone = store
            .save_clone("Mine", &VoiceId::new("v1"), "alice")
            .await
            .unwrap();
        store
            .save_clone("Theirs", &VoiceId::new("v2"), "bob")
            .await
            .unwrap();
        store.save_speech(&clone.id, "Hello").await.unwrap();

        let history = load_history(&store, Some(&alice())).await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].clone.name, "Mine");
        assert_eq!(history[0].speeches.len(), 1);
        assert_eq!(history[0].speeches[0].text, "Hello");
    }

    #[tokio::test]
    async fn finds_only_own_saved_clone() {
        let store = MemoryStore::new();
        store
            .save_clone("Mine", &VoiceId::new("v1"), "alice")
            .await
            .unwrap();
        store
            .save_clone("Theirs", &VoiceId::new("v2"), "bob")
            .await
            .unwrap();

        let found = find_saved_clone(&store, &alice(), &VoiceId::new("v1"))
            .await
            .unwrap();
        assert_eq!(found.map(|c| c.name).as_deref(), Some("Mine"));
        let other = find_saved_clone(&store, &alice(), &VoiceId::new("v2"))
            .await
            .unwrap();
        assert_eq!(other, None);
    }

    #[tokio::test]
    async fn lookup_failure_is_reported() {
        let store = MemoryStore::new();
        store.set_fail_reads(true);

        let err = find_saved_clone(&store, &alice(), &VoiceId::new("v1"))
            .await
            .unwrap_err();

        assert!(matches!(err, VoiceError::PersistenceError(_)));
    }
}
