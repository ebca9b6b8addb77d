// Configuration for the streaming server, read from the environment

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use streamtts_core::remote::{self, RemoteConfig};
use streamtts_core::segment::{DEFAULT_MAX_WORDS, DEFAULT_MIN_WORDS};
use streamtts_core::Segmenter;

pub const DEFAULT_MODEL: &str = "tts_models/en/ljspeech/fast_pitch";
pub const DEFAULT_MAX_TEXT_CHARS: usize = 20_000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,

    pub model_map: PathBuf,
    pub default_model: String,
    pub default_voice: String,
    /// `auto`, `cpu` or `cuda`
    pub device: String,
    pub scratch_dir: PathBuf,

    pub max_words: usize,
    pub min_words: usize,
    pub max_text_chars: usize,

    pub google_api_key: Option<String>,
    pub google_base_url: String,
    pub google_model: String,
    pub google_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            rate_limit_per_minute: 60,
            request_timeout_secs: 60,
            cors_allowed_origins: None,
            model_map: PathBuf::from("models/map.json"),
            default_model: DEFAULT_MODEL.to_string(),
            default_voice: remote::DEFAULT_VOICE.to_string(),
            device: "auto".to_string(),
            scratch_dir: PathBuf::from("./tmp"),
            max_words: DEFAULT_MAX_WORDS,
            min_words: DEFAULT_MIN_WORDS,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            google_api_key: None,
            google_base_url: remote::DEFAULT_BASE_URL.to_string(),
            google_model: remote::DEFAULT_MODEL.to_string(),
            google_timeout_secs: remote::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            });

        Self {
            port: env_parse("PORT", defaults.port),
            rate_limit_per_minute: env_parse("RATE_LIMIT_PER_MINUTE", defaults.rate_limit_per_minute),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            cors_allowed_origins,
            model_map: env_string("TTS_MODEL_MAP").map(PathBuf::from).unwrap_or(defaults.model_map),
            default_model: env_string("TTS_DEFAULT_MODEL").unwrap_or(defaults.default_model),
            default_voice: env_string("TTS_DEFAULT_VOICE").unwrap_or(defaults.default_voice),
            device: env_string("TTS_DEVICE").unwrap_or(defaults.device),
            scratch_dir: env_string("TTS_SCRATCH_DIR").map(PathBuf::from).unwrap_or(defaults.scratch_dir),
            max_words: env_parse("TTS_MAX_WORDS", defaults.max_words),
            min_words: env_parse("TTS_MIN_WORDS", defaults.min_words),
            max_text_chars: env_parse("TTS_MAX_TEXT_CHARS", defaults.max_text_chars),
            google_api_key: env_string("GOOGLE_API_KEY"),
            google_base_url: env_string("GOOGLE_TTS_BASE_URL").unwrap_or(defaults.google_base_url),
            google_model: env_string("GOOGLE_TTS_MODEL").unwrap_or(defaults.google_model),
            google_timeout_secs: env_parse("GOOGLE_TTS_TIMEOUT_SECS", defaults.google_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn segmenter(&self) -> Segmenter {
        Segmenter::new(self.max_words, self.min_words)
    }

    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            api_key: self.google_api_key.clone(),
            base_url: self.google_base_url.clone(),
            model: self.google_model.clone(),
            timeout: Duration::from_secs(self.google_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8085);
        assert_eq!(config.default_voice, "Puck");
        assert_eq!(config.segmenter().max_words(), 20);
        assert_eq!(config.segmenter().min_words(), 10);

        let remote = config.remote_config();
        assert!(remote.api_key.is_none());
        assert_eq!(remote.timeout, Duration::from_secs(60));
    }
}
