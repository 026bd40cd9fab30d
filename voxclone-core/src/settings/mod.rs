pub mod config;
pub mod manager;

pub use config::{
    CloneSettings, ProviderSettings, Settings, SpeechSettings, StorageSettings, API_KEY_ENV,
    DEFAULT_WELCOME_MESSAGE, MIN_POLL_INTERVAL_MS,
};
pub use manager::SettingsManager;

#[cfg(test)]
mod tests;
