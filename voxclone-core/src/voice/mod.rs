//! Remote voice cloning and text-to-speech

pub mod cartesia;
pub mod client;
pub mod mock;
pub mod provider;
pub mod types;

pub use client::CloneClient;
pub use provider::VoiceCloneProvider;
pub use types::{CloneMode, OutputFormat, RemoteStatus, SpeechAudio, VoiceId};
