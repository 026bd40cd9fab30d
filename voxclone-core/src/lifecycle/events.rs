use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::state::CloneState;
use crate::persistence::{SpeechRecord, VoiceCloneRecord};
use crate::speech::GeneratedSpeech;
use crate::voice::VoiceId;

/// Messages emitted by [`CloneLifecycle`](super::CloneLifecycle).
///
/// Front ends (the CLI, tests) consume these to render progress,
/// notifications and audio. Nothing in the lifecycle waits on a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum LifecycleEvent {
    StateChanged {
        from: CloneState,
        to: CloneState,
        voice_id: Option<VoiceId>,
    },
    Notification {
        level: NotificationLevel,
        message: String,
    },
    /// Greeting spoken in the new voice once it is ready.
    WelcomeSpeech(GeneratedSpeech),
    CloneSaved(VoiceCloneRecord),
    SpeechSaved(SpeechRecord),
    /// Shown once per lifecycle to anonymous users after their first speech.
    SignUpSuggested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Clone)]
pub struct EventSender {
    event_tx: mpsc::UnboundedSender<LifecycleEvent>,
    event_history: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl EventSender {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (event_tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                event_tx,
                event_history: Arc::new(Mutex::new(Vec::new())),
            },
            rx,
        )
    }

    pub fn send(&self, event: LifecycleEvent) {
        self.event_history.lock().unwrap().push(event.clone());
        let _ = self.event_tx.send(event);
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.send(LifecycleEvent::Notification {
            level,
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }

    /// Everything sent so far, in order.
    pub fn event_history(&self) -> Vec<LifecycleEvent> {
        self.event_history.lock().unwrap().clone()
    }
}
