#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::mpsc;
use voxclone_core::auth::Identity;
use voxclone_core::capture::{encode_wav, AudioCapture};
use voxclone_core::lifecycle::{CloneLifecycle, CloneState, EventSender, LifecycleEvent};
use voxclone_core::persistence::{CloneStore, MemoryStore};
use voxclone_core::settings::Settings;
use voxclone_core::voice::mock::MockVoiceProvider;

pub const SAMPLE_RATE: u32 = 8_000;

pub struct Fixture {
    pub provider: MockVoiceProvider,
    pub store: MemoryStore,
    pub lifecycle: CloneLifecycle,
    pub event_rx: mpsc::UnboundedReceiver<LifecycleEvent>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::with_store(settings, MemoryStore::new())
    }

    pub fn with_store(settings: Settings, store: MemoryStore) -> Self {
        let provider = MockVoiceProvider::default();
        let (events, event_rx) = EventSender::new();
        let lifecycle = CloneLifecycle::new(
            Arc::new(provider.clone()),
            Arc::new(store.clone()) as Arc<dyn CloneStore>,
            &settings,
            events,
        );
        Self {
            provider,
            store,
            lifecycle,
            event_rx,
        }
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.lifecycle.events().event_history()
    }

    /// Target state of every `StateChanged` event so far.
    pub fn transitions(&self) -> Vec<CloneState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    pub fn count_events(&self, predicate: impl Fn(&LifecycleEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

/// A silent mono WAV recording of the given length.
pub fn recording(seconds: u32) -> AudioCapture {
    let samples = vec![0_i16; (SAMPLE_RATE * seconds) as usize];
    AudioCapture::new(encode_wav(&samples, SAMPLE_RATE).unwrap(), "audio/wav")
}

pub fn alice() -> Identity {
    Identity {
        id: "alice-id".to_string(),
        email: Some("alice@example.com".to_string()),
    }
}

pub fn quiet_settings() -> Settings {
    let mut settings = Settings::default();
    settings.speech.welcome_enabled = false;
    settings
}
