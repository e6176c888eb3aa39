//! Text-to-speech through the ElevenLabs HTTP API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("speech API returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("speech API returned no audio")]
    EmptyAudio,
}

#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Synthesizes `text` into MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError>;
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Deserialize)]
struct VoiceList {
    voices: Vec<Voice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Voice {
    voice_id: String,
    name: String,
}

pub struct ElevenLabsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    voice: String,
    model: String,
    voice_id: OnceCell<String>,
}

impl ElevenLabsClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.tts_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.elevenlabs_url.trim_end_matches('/').to_string(),
            api_key: config.elevenlabs_api_key.clone(),
            voice: config.tts_voice.clone(),
            model: config.tts_model.clone(),
            voice_id: OnceCell::new(),
        })
    }

    /// Resolves the configured voice once. A failed lookup falls back to the
    /// raw setting for this call and is retried next time.
    async fn voice_id(&self) -> String {
        if let Some(id) = self.voice_id.get() {
            return id.clone();
        }

        match self.list_voices().await {
            Ok(voices) => {
                let id = resolve_voice_id(&voices, &self.voice);
                info!("Using voice {} ({})", self.voice, id);
                let _ = self.voice_id.set(id.clone());
                id
            }
            Err(e) => {
                warn!("Failed to list voices, using {} as a voice id: {}", self.voice, e);
                self.voice.clone()
            }
        }
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError> {
        let response = self
            .http
            .get(format!("{}/voices", self.base_url))
            .header("xi-api-key", &self.api_key)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<VoiceList>().await?.voices)
    }
}

#[async_trait]
impl SpeechClient for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let voice_id = self.voice_id().await;
        debug!("Synthesizing {} characters with voice {}", text.len(), voice_id);

        let response = self
            .http
            .post(format!("{}/text-to-speech/{}", self.base_url, voice_id))
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&SynthesisRequest {
                text,
                model_id: &self.model,
            })
            .send()
            .await?;
        let response = check_status(response).await?;

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(audio.to_vec())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SpeechError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SpeechError::Api { status, body })
}

/// Matches a configured voice against the account's voices by name,
/// case-insensitively. Anything unmatched is taken to already be a voice id.
fn resolve_voice_id(voices: &[Voice], wanted: &str) -> String {
    match voices
        .iter()
        .find(|voice| voice.name.eq_ignore_ascii_case(wanted) || voice.voice_id == wanted)
    {
        Some(voice) => voice.voice_id.clone(),
        None => {
            warn!("Voice {} not found by name, using it as a voice id", wanted);
            wanted.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<Voice> {
        serde_json::from_value::<VoiceList>(serde_json::json!({
            "voices": [
                { "voice_id": "abc123", "name": "Kira", "category": "premade" },
                { "voice_id": "def456", "name": "Rachel" }
            ]
        }))
        .unwrap()
        .voices
    }

    #[test]
    fn resolves_voice_by_name() {
        assert_eq!(resolve_voice_id(&voices(), "kira"), "abc123");
        assert_eq!(resolve_voice_id(&voices(), "Rachel"), "def456");
    }

    #[test]
    fn unknown_voice_is_treated_as_id() {
        assert_eq!(resolve_voice_id(&voices(), "def456"), "def456");
        assert_eq!(resolve_voice_id(&voices(), "zzz999"), "zzz999");
    }

    #[test]
    fn synthesis_body_shape() {
        let body = serde_json::to_value(SynthesisRequest {
            text: "halo",
            model_id: "eleven_flash_v2_5",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "text": "halo", "model_id": "eleven_flash_v2_5" })
        );
    }

    #[test]
    fn base_url_is_normalized() {
        let mut config = crate::config::test_config();
        config.elevenlabs_url = "http://localhost:9000/v1/".to_string();
        let client = ElevenLabsClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:9000/v1");
    }
}
