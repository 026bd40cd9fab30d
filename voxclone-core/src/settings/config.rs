use crate::voice::cartesia::{CartesiaConfig, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
use crate::voice::{CloneMode, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const API_KEY_ENV: &str = "CARTESIA_API_KEY";

/// Status queries are never sent more often than this.
pub const MIN_POLL_INTERVAL_MS: u64 = 250;

pub const DEFAULT_WELCOME_MESSAGE: &str = "Hello, your voice clone is ready! How do I sound?";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSettings {
    /// Cartesia API key. When empty, `CARTESIA_API_KEY` is used instead.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            api_version: default_api_version(),
        }
    }
}

/// Parameters for clone submission and readiness polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloneSettings {
    #[serde(default)]
    pub mode: CloneMode,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_true")]
    pub enhance: bool,

    /// Samples smaller than this are rejected before upload
    #[serde(default = "default_min_audio_bytes")]
    pub min_audio_bytes: usize,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for CloneSettings {
    fn default() -> Self {
        Self {
            mode: CloneMode::default(),
            language: default_language(),
            enhance: true,
            min_audio_bytes: default_min_audio_bytes(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl CloneSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechSettings {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// Longer input is truncated to this many characters
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    /// Speak `welcome_message` once a clone becomes ready
    #[serde(default = "default_true")]
    pub welcome_enabled: bool,

    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    #[serde(default)]
    pub output_format: OutputFormat,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            language: default_language(),
            max_text_chars: default_max_text_chars(),
            welcome_enabled: true,
            welcome_message: default_welcome_message(),
            output_format: OutputFormat::default(),
        }
    }
}

impl SpeechSettings {
    pub fn welcome_text(&self) -> Option<&str> {
        let message = self.welcome_message.trim();
        (self.welcome_enabled && !message.is_empty()).then_some(message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageSettings {
    /// Where clone records, accounts and the session live. Defaults to ~/.voxclone
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Core application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub clone: CloneSettings,

    #[serde(default)]
    pub speech: SpeechSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl Settings {
    /// Reject values that would load but make no sense at runtime.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.clone.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            anyhow::bail!(
                "clone.poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}, got {}",
                self.clone.poll_interval_ms
            );
        }
        if self.speech.max_text_chars == 0 {
            anyhow::bail!("speech.max_text_chars must be greater than 0");
        }
        Ok(())
    }

    /// Resolve the API key, preferring the settings file over the environment.
    pub fn api_key(&self) -> Option<String> {
        if !self.provider.api_key.trim().is_empty() {
            return Some(self.provider.api_key.clone());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn cartesia_config(&self) -> Option<CartesiaConfig> {
        let api_key = self.api_key()?;
        Some(CartesiaConfig {
            api_key,
            base_url: self.provider.base_url.clone(),
            api_version: self.provider.api_version.clone(),
        })
    }

    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage
            .data_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".voxclone")))
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_audio_bytes() -> usize {
    5 * 1024
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_model_id() -> String {
    "sonic-2".to_string()
}

fn default_max_text_chars() -> usize {
    500
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}
