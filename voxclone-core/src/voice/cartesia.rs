//! Cartesia voice cloning and text-to-speech implementation

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::provider::VoiceCloneProvider;
use super::types::{CloneRequest, OutputFormat, RemoteStatus, SpeechRequest, VoiceId};
use crate::error::VoiceError;

pub const DEFAULT_BASE_URL: &str = "https://api.cartesia.ai";
pub const DEFAULT_API_VERSION: &str = "2024-11-13";

#[derive(Debug, Clone)]
pub struct CartesiaConfig {
    pub api_key: String,
    pub base_url: String,
    pub api_version: String,
}

impl CartesiaConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

pub struct Cartesia {
    config: CartesiaConfig,
    client: Client,
}

impl Cartesia {
    pub fn new(config: CartesiaConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("X-API-Key", &self.config.api_key)
            .header("Cartesia-Version", &self.config.api_version)
    }
}

#[derive(Deserialize)]
struct VoiceResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Serialize)]
struct VoiceSpecifier<'a> {
    mode: &'static str,
    id: &'a str,
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    model_id: &'a str,
    transcript: &'a str,
    voice: VoiceSpecifier<'a>,
    language: &'a str,
    output_format: &'a OutputFormat,
}

async fn error_body(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

#[async_trait]
impl VoiceCloneProvider for Cartesia {
    fn name(&self) -> &'static str {
        "cartesia"
    }

    async fn clone_voice(&self, request: CloneRequest) -> Result<VoiceId, VoiceError> {
        debug!(
            bytes = request.audio.len(),
            mime_type = request.audio.mime_type(),
            name = %request.name,
            "sending voice clone request"
        );

        let file_name = format!("voice.{}", request.audio.extension());
        let mime_type = request.audio.mime_type().to_string();
        let clip = Part::bytes(request.audio.into_data())
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|e| VoiceError::InvalidAudio(format!("invalid mime type {mime_type}: {e}")))?;

        let form = Form::new()
            .part("clip", clip)
            .text("name", request.name)
            .text("description", request.description)
            .text("mode", request.mode.to_string())
            .text("language", request.language)
            .text("enhance", request.enhance.to_string());

        let response = self
            .authorize(self.client.post(self.url("voices/clone")))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            error!(status, body = %body, "voice clone request rejected");
            return Err(VoiceError::from_status(status, body));
        }

        let voice: VoiceResponse = response.json().await?;
        let id = voice
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| VoiceError::remote(None, "clone response did not include an id"))?;

        info!(voice_id = %id, "voice clone created");
        Ok(VoiceId::new(id))
    }

    async fn voice_status(&self, voice_id: &VoiceId) -> RemoteStatus {
        let url = self.url(&format!("voices/{}", voice_id.as_str()));
        let response = match self.authorize(self.client.get(url)).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(voice_id = %voice_id, error = %e, "voice status request failed");
                return RemoteStatus::Failed(e.to_string());
            }
        };

        if response.status() == StatusCode::NOT_FOUND {
            return RemoteStatus::NotFound;
        }
        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            warn!(voice_id = %voice_id, status, body = %body, "voice status rejected");
            return RemoteStatus::Failed(format!("status {status}: {body}"));
        }

        // The voice endpoint has no explicit status field; a populated id is
        // the only readiness signal it gives.
        match response.json::<VoiceResponse>().await {
            Ok(VoiceResponse { id: Some(id) }) if !id.is_empty() => RemoteStatus::Ready,
            Ok(_) => RemoteStatus::Processing,
            Err(e) => RemoteStatus::Failed(format!("failed to parse voice response: {e}")),
        }
    }

    async fn synthesize(&self, request: SpeechRequest) -> Result<Vec<u8>, VoiceError> {
        let body = TtsRequest {
            model_id: &request.model_id,
            transcript: &request.transcript,
            voice: VoiceSpecifier {
                mode: "id",
                id: request.voice_id.as_str(),
            },
            language: &request.language,
            output_format: &request.output_format,
        };

        let response = self
            .authorize(self.client.post(self.url("tts/bytes")))
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::remote(e.status().map(|s| s.as_u16()), e.to_string()))?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            error!(status, body = %body, "speech generation rejected");
            return Err(VoiceError::remote(Some(status), body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::remote(None, format!("failed to read audio bytes: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tts_request_wire_format() {
        let format = OutputFormat::default();
        let body = TtsRequest {
            model_id: "sonic-2",
            transcript: "Hello",
            voice: VoiceSpecifier {
                mode: "id",
                id: "abc123",
            },
            language: "en",
            output_format: &format,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model_id": "sonic-2",
                "transcript": "Hello",
                "voice": { "mode": "id", "id": "abc123" },
                "language": "en",
                "output_format": {
                    "container": "wav",
                    "sample_rate": 44100,
                    "encoding": "pcm_f32le"
                }
            })
        );
    }

    #[test]
    fn url_joins_base_without_double_slash() {
        let mut config = CartesiaConfig::new("key".to_string());
        config.base_url = "http://localhost:8080/".to_string();
        let cartesia = Cartesia::new(config);
        assert_eq!(cartesia.url("voices/clone"), "http://localhost:8080/voices/clone");
    }

    #[tokio::test]
    async fn unreachable_host_reports_failed_status() {
        let mut config = CartesiaConfig::new("key".to_string());
        config.base_url = "http://127.0.0.1:9".to_string();
        let cartesia = Cartesia::new(config);
        let status = cartesia.voice_status(&VoiceId::new("abc123")).await;
        assert!(matches!(status, RemoteStatus::Failed(_)));
    }
}
