use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use voxclone_core::auth::{AuthProvider, Identity, LocalAuth};
use voxclone_core::error::VoiceError;
use voxclone_core::history::load_history;
use voxclone_core::lifecycle::{CloneLifecycle, CloneState, EventSender, LifecycleEvent};
use voxclone_core::persistence::{CloneStore, JsonFileStore, VoiceCloneRecord};
use voxclone_core::voice::mock::{MockStatusBehavior, MockVoiceProvider};
use voxclone_core::voice::{RemoteStatus, VoiceId};

mod fixture;

use fixture::{alice, quiet_settings, recording, Fixture};

#[tokio::test(start_paused = true)]
async fn authenticated_clone_is_saved_exactly_once() {
    let fixture = Fixture::with_settings(quiet_settings());

    let state = fixture
        .lifecycle
        .submit(Some(&recording(31)), "Test", Some(alice()))
        .await
        .unwrap();

    assert_eq!(state, CloneState::Ready);
    assert_eq!(fixture.provider.status_calls(), 1);
    assert_eq!(
        fixture.store.save_clone_calls(),
        vec![(
            "Test".to_string(),
            VoiceId::new("abc123"),
            "alice-id".to_string()
        )]
    );
    assert!(fixture.lifecycle.record_id().is_some());
    assert_eq!(
        fixture.count_events(|e| matches!(e, LifecycleEvent::CloneSaved(_))),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn authenticated_wait_applies_same_terminal_states() {
    let fixture = Fixture::with_settings(quiet_settings());
    fixture
        .provider
        .set_status_behavior(MockStatusBehavior::Sequence(vec![
            RemoteStatus::Processing,
            RemoteStatus::NotFound,
        ]));

    let state = fixture
        .lifecycle
        .submit(Some(&recording(31)), "Test", Some(alice()))
        .await
        .unwrap();

    assert_eq!(state, CloneState::NotFound);
    assert_eq!(fixture.provider.status_calls(), 2);
    assert!(fixture.store.save_clone_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_moves_to_error() {
    let fixture = Fixture::with_settings(quiet_settings());
    fixture.store.set_fail_writes(true);

    let err = fixture
        .lifecycle
        .submit(Some(&recording(31)), "Test", Some(alice()))
        .await
        .unwrap_err();

    assert!(matches!(err, VoiceError::PersistenceError(_)));
    assert_eq!(fixture.lifecycle.state(), CloneState::Error);
    assert_eq!(fixture.store.save_clone_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_during_wait_skips_persistence() {
    let fixture = Fixture::with_settings(quiet_settings());
    fixture
        .provider
        .set_status_behavior(MockStatusBehavior::AlwaysProcessing);

    let lifecycle = fixture.lifecycle.clone();
    let audio = recording(31);
    let submit =
        tokio::spawn(async move { lifecycle.submit(Some(&audio), "Test", Some(alice())).await });

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(fixture.lifecycle.state(), CloneState::Processing);
    fixture.lifecycle.reset();

    let state = submit.await.unwrap().unwrap();
    assert_eq!(state, CloneState::Idle);

    let calls = fixture.provider.status_calls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(fixture.provider.status_calls(), calls);
    assert!(fixture.store.save_clone_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn speech_is_recorded_in_the_background() {
    let fixture = Fixture::with_settings(quiet_settings());
    fixture
        .lifecycle
        .submit(Some(&recording(31)), "Test", Some(alice()))
        .await
        .unwrap();
    let record_id = fixture.lifecycle.record_id().unwrap();

    fixture.lifecycle.generate("Hello").await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let speeches = fixture.store.list_speeches(&record_id).await.unwrap();
    assert_eq!(speeches.len(), 1);
    assert_eq!(speeches[0].text, "Hello");
    assert_eq!(
        fixture.count_events(|e| matches!(e, LifecycleEvent::SpeechSaved(_))),
        1
    );
    assert_eq!(
        fixture.count_events(|e| matches!(e, LifecycleEvent::SignUpSuggested)),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn failed_speech_record_does_not_fail_generation() {
    let fixture = Fixture::with_settings(quiet_settings());
    fixture
        .lifecycle
        .submit(Some(&recording(31)), "Test", Some(alice()))
        .await
        .unwrap();
    fixture.store.set_fail_writes(true);

    let speech = fixture.lifecycle.generate("Hello").await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!speech.audio.data.is_empty());
    assert_eq!(fixture.store.save_speech_calls(), 1);
    assert_eq!(fixture.lifecycle.state(), CloneState::Ready);
    assert_eq!(
        fixture.count_events(|e| matches!(e, LifecycleEvent::SpeechSaved(_))),
        0
    );
}

#[tokio::test]
async fn resume_saved_clone() {
    let fixture = Fixture::with_settings(quiet_settings());
    let record = VoiceCloneRecord::new(
        "Saved".to_string(),
        VoiceId::new("saved-voice"),
        "alice-id".to_string(),
    );
    fixture.store.insert_clone(record.clone());

    fixture.lifecycle.resume(&record, alice()).unwrap();

    assert_eq!(fixture.lifecycle.state(), CloneState::Ready);
    assert_eq!(fixture.lifecycle.voice_id(), Some(VoiceId::new("saved-voice")));
    assert_eq!(fixture.lifecycle.record_id(), Some(record.id.clone()));
    assert_eq!(fixture.provider.total_calls(), 0);
}

#[tokio::test]
async fn resume_rejects_another_users_clone() {
    let fixture = Fixture::new();
    let record = VoiceCloneRecord::new(
        "Theirs".to_string(),
        VoiceId::new("their-voice"),
        "bob-id".to_string(),
    );

    let err = fixture.lifecycle.resume(&record, alice()).unwrap_err();

    assert!(matches!(err, VoiceError::Unauthorized(_)));
    assert_eq!(fixture.lifecycle.state(), CloneState::Idle);
}

#[tokio::test(start_paused = true)]
async fn signed_in_session_builds_history_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let auth = LocalAuth::new(temp_dir.path());
    let identity: Identity = auth.sign_up("ada@example.com", "hunter22").await.unwrap();

    let provider = MockVoiceProvider::default();
    let store: Arc<dyn CloneStore> = Arc::new(JsonFileStore::new(temp_dir.path()));
    let (events, _event_rx) = EventSender::new();
    let lifecycle = CloneLifecycle::new(
        Arc::new(provider.clone()),
        store.clone(),
        &quiet_settings(),
        events,
    );

    lifecycle
        .submit(
            Some(&recording(31)),
            "Ada",
            auth.current_identity().await,
        )
        .await
        .unwrap();
    lifecycle.generate("First words").await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let history = load_history(store.as_ref(), Some(&identity)).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].clone.name, "Ada");
    assert_eq!(history[0].clone.user_id, identity.id);
    assert_eq!(history[0].speeches[0].text, "First words");

    auth.sign_out().await.unwrap();
    let err = load_history(store.as_ref(), auth.current_identity().await.as_ref())
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceError::Unauthorized(_)));
}
