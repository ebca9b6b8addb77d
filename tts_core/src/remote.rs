//! Google Gemini text-to-speech over HTTP.

use std::time::Duration;

use base64::Engine as _;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::SynthesisError;
use crate::wav::{self, REMOTE_SAMPLE_RATE};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Puck";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prebuilt voices accepted by the remote model.
pub const VOICES: &[&str] = &[
    "Zephyr", "Puck", "Charon", "Kore", "Fenrir", "Leda", "Orus", "Aoede", "Callirrhoe",
    "Autonoe", "Enceladus", "Iapetus", "Umbriel", "Algieba", "Despina",
];

const AUDIO_PATH: &str = "/candidates/0/content/parts/0/inlineData";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Read once at startup. `None` makes every call fail with a configuration error.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig<'a>,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'a str; 1],
    temperature: f32,
    speech_config: SpeechConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoice<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice<'a> {
    voice_name: &'a str,
}

/// Client for the hosted synthesis endpoint.
#[derive(Debug, Clone)]
pub struct RemoteEngine {
    client: Client,
    config: RemoteConfig,
}

impl RemoteEngine {
    pub fn new(config: RemoteConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                SynthesisError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self { client, config })
    }

    pub fn has_credential(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Synthesize one chunk with `voice` and return it as a complete WAV file.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SynthesisError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            SynthesisError::Configuration("GOOGLE_API_KEY environment variable not set.".into())
        })?;

        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                temperature: 1.0,
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoice { voice_name: voice },
                    },
                },
            },
            model: &self.config.model,
        };

        let response = self
            .client
            .post(self.url())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Remote TTS request failed");
            return Err(SynthesisError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let json: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| SynthesisError::Protocol(format!("body is not JSON: {e}")))?;
        let (pcm, sample_rate) = extract_audio(&json)?;
        debug!(pcm_bytes = pcm.len(), sample_rate, "Remote audio received");

        wav::pcm16_to_wav(&pcm, sample_rate)
            .map_err(|e| SynthesisError::Protocol(format!("cannot wrap audio: {e}")))
    }
}

/// Pull the base64 PCM payload and its sample rate out of a response.
fn extract_audio(json: &serde_json::Value) -> Result<(Vec<u8>, u32), SynthesisError> {
    let inline = json.pointer(AUDIO_PATH).ok_or_else(|| {
        SynthesisError::Protocol("missing candidates[0].content.parts[0].inlineData".into())
    })?;
    let data = inline
        .get("data")
        .and_then(|d| d.as_str())
        .ok_or_else(|| SynthesisError::Protocol("missing inlineData.data".into()))?;
    let pcm = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| SynthesisError::Protocol(format!("audio is not base64: {e}")))?;

    let sample_rate = inline
        .get("mimeType")
        .and_then(|m| m.as_str())
        .and_then(rate_from_mime)
        .unwrap_or(REMOTE_SAMPLE_RATE);
    Ok((pcm, sample_rate))
}

/// `audio/L16;codec=pcm;rate=24000` -> 24000
fn rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|r| r.parse().ok())
}
