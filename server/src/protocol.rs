//! Messages exchanged over a synthesis session.
//!
//! Clients send one JSON request per synthesis. The server answers with text
//! status lines, each starting with a marker character, interleaved with one
//! binary WAV frame per synthesized chunk.

use std::fmt;

use serde::Deserialize;
use streamtts_core::SynthesisError;

/// `{"text": "...", "engine": "coqui"|"google", "speaker": "...", "voice": "..."}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SynthesisRequest {
    #[serde(default)]
    pub text: String,
    pub engine: Option<String>,
    /// Local model identifier.
    pub speaker: Option<String>,
    /// Remote voice name.
    pub voice: Option<String>,
}

pub const MARK_START: char = '🔊';
pub const MARK_PROGRESS: char = '▶';
pub const MARK_ERROR: char = '❌';
pub const MARK_DONE: char = '✅';

#[derive(Debug)]
pub enum Status<'a> {
    Starting,
    /// `index` is zero-based; clients see it one-based.
    Progress { index: usize, chunk: &'a str },
    Failure(&'a SynthesisError),
    ChunkFailure { index: usize, error: &'a SynthesisError },
    Done,
    ServerError(&'a str),
}

impl fmt::Display for Status<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Starting => write!(f, "{MARK_START} Starting streaming synthesis..."),
            Status::Progress { index, chunk } => {
                write!(f, "{MARK_PROGRESS} Generating chunk {}: {chunk}", index + 1)
            }
            Status::Failure(error) => write!(f, "{MARK_ERROR} {error}"),
            Status::ChunkFailure { index, error } => {
                write!(f, "{MARK_ERROR} Chunk {}: {error}", index + 1)
            }
            Status::Done => write!(f, "{MARK_DONE} All chunks sent."),
            Status::ServerError(detail) => write!(f, "{MARK_ERROR} A server error occurred: {detail}"),
        }
    }
}
