use thiserror::Error;

use crate::lifecycle::state::CloneState;

/// Every failure the clone lifecycle can surface.
///
/// Validation variants (`AudioTooShort`, `EmptyInput`, `MissingName`,
/// `MissingAudio`) are raised before any network call. Remote variants carry
/// whatever the provider told us; `RemoteError` keeps the HTTP status when
/// one was available.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("audio sample is too short ({actual} bytes, need at least {minimum})")]
    AudioTooShort { actual: usize, minimum: usize },

    #[error("audio rejected by provider: {0}")]
    InvalidAudio(String),

    #[error("audio payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("voice clone not found: {0}")]
    NotFound(String),

    #[error("remote error{}: {message}", status.map(|s| format!(" {s}")).unwrap_or_default())]
    RemoteError {
        status: Option<u16>,
        message: String,
    },

    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("text input is empty")]
    EmptyInput,

    #[error("voice clone name is required")]
    MissingName,

    #[error("no audio recorded or uploaded")]
    MissingAudio,

    #[error("voice clone is not ready (state: {state})")]
    NotReady { state: CloneState },

    #[error("invalid operation: {0}")]
    InvalidState(String),
}

impl VoiceError {
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteError {
            status,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status from the voice provider.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            400 | 415 | 422 => Self::InvalidAudio(body),
            401 | 403 => Self::Unauthorized(body),
            404 => Self::NotFound(body),
            413 => Self::PayloadTooLarge(body),
            _ => Self::remote(Some(status), body),
        }
    }

    /// Provider status code, if this error came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteError { status, .. } => *status,
            _ => None,
        }
    }

    /// Short text shown to the user as a notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::DeviceUnavailable(_) => {
                "Unable to access microphone. Please check your permissions.".to_string()
            }
            Self::AudioTooShort { .. } => {
                "Recording is too short. Please record a longer sample.".to_string()
            }
            Self::InvalidAudio(_) => {
                "The voice service could not use this audio. Try a different recording."
                    .to_string()
            }
            Self::PayloadTooLarge(_) => {
                "The recording is too large. Try a shorter sample.".to_string()
            }
            Self::Unauthorized(_) => "Not authorized. Check your API key or sign in.".to_string(),
            Self::NotFound(_) => "Voice clone could not be found.".to_string(),
            Self::RemoteError {
                status: Some(status),
                message,
            } => format!("Voice service error {status}: {message}"),
            Self::RemoteError {
                status: None,
                message,
            } => format!("Voice service error: {message}"),
            Self::PersistenceError(_) => "Could not save or load your data.".to_string(),
            Self::EmptyInput => "Please enter some text for speech generation".to_string(),
            Self::MissingName => "Voice clone name is required".to_string(),
            Self::MissingAudio => "Please record or upload audio first".to_string(),
            Self::NotReady { .. } => "Voice clone is not ready yet".to_string(),
            Self::InvalidState(message) => message.clone(),
        }
    }
}

impl From<reqwest::Error> for VoiceError {
    fn from(source: reqwest::Error) -> Self {
        match source.status() {
            Some(status) => Self::from_status(status.as_u16(), source.to_string()),
            None => Self::remote(None, source.to_string()),
        }
    }
}

impl From<serde_json::Error> for VoiceError {
    fn from(source: serde_json::Error) -> Self {
        Self::PersistenceError(source.to_string())
    }
}

impl From<std::io::Error> for VoiceError {
    fn from(source: std::io::Error) -> Self {
        Self::PersistenceError(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            VoiceError::from_status(413, "big"),
            VoiceError::PayloadTooLarge(_)
        ));
        assert!(matches!(
            VoiceError::from_status(422, "bad"),
            VoiceError::InvalidAudio(_)
        ));
        assert!(matches!(
            VoiceError::from_status(401, "key"),
            VoiceError::Unauthorized(_)
        ));
        let err = VoiceError::from_status(503, "busy");
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.user_message(), "Voice service error 503: busy");
    }

    #[test]
    fn remote_error_display_without_status() {
        let err = VoiceError::remote(None, "connection reset");
        assert_eq!(err.to_string(), "remote error: connection reset");
    }
}
