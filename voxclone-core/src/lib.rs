pub mod auth;
pub mod capture;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod persistence;
pub mod playback;
pub mod poller;
pub mod settings;
pub mod speech;
pub mod voice;

// Public library API - the types a front end needs to drive the
// record -> clone -> speak flow.
pub use auth::{AuthProvider, Identity, LocalAuth};
pub use capture::AudioCapture;
pub use error::VoiceError;
pub use lifecycle::{CloneLifecycle, CloneState, EventSender, LifecycleEvent};
pub use persistence::{CloneStore, JsonFileStore};
pub use settings::{Settings, SettingsManager};
pub use voice::{VoiceCloneProvider, VoiceId};
