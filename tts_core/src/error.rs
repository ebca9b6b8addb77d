use thiserror::Error;

/// Everything that can go wrong between receiving text and producing audio.
///
/// The `Display` text is what the client sees in its status stream, so it is
/// phrased for a person rather than for a log file.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Error: The received text is empty.")]
    EmptyInput,

    #[error("Error: Text too long (max {max} characters).")]
    TextTooLong { max: usize },

    #[error("Error: Unsupported engine '{0}'. Use 'coqui' or 'google'.")]
    UnsupportedEngine(String),

    #[error("Error: The TTS model '{0}' could not be initialized.")]
    ModelUnavailable(String),

    #[error("Error generating audio: {0}")]
    LocalSynthesis(String),

    #[error("Error: {0}")]
    Configuration(String),

    #[error("Error calling Google TTS API (HTTP {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Error calling Google TTS API: request timed out")]
    Timeout,

    #[error("Error calling Google TTS API: {0}")]
    Request(String),

    #[error("Invalid response from Google TTS API: {0}")]
    Protocol(String),
}

impl SynthesisError {
    /// Short machine-friendly label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::TextTooLong { .. } => "text_too_long",
            Self::UnsupportedEngine(_) => "unsupported_engine",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::LocalSynthesis(_) => "local_synthesis",
            Self::Configuration(_) => "configuration",
            Self::Upstream { .. } | Self::Timeout | Self::Request(_) => "upstream",
            Self::Protocol(_) => "protocol",
        }
    }
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            // the url may carry credentials
            Self::Request(err.without_url().to_string())
        }
    }
}
