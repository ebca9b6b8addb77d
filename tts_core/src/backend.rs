use std::str::FromStr;
use std::sync::Arc;

use crate::error::SynthesisError;
use crate::local::LocalEngine;
use crate::remote::RemoteEngine;
use crate::scratch::{ScratchDir, ScratchFile};

/// Which synthesis engine a request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    Local,
    Remote,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "coqui",
            Self::Remote => "google",
        }
    }
}

impl FromStr for EngineKind {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coqui" | "local" => Ok(Self::Local),
            "google" | "remote" => Ok(Self::Remote),
            other => Err(SynthesisError::UnsupportedEngine(other.to_string())),
        }
    }
}

/// What the chunk loop does after a chunk fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop producing chunks for this request.
    AbortRequest,
    /// Report the chunk and continue with the next one.
    SkipChunk,
}

/// Synthesized audio for one chunk.
///
/// Local audio keeps its scratch file alive until the chunk is dropped.
#[derive(Debug)]
pub struct AudioChunk {
    bytes: Vec<u8>,
    artifact: Option<ScratchFile>,
}

impl AudioChunk {
    pub fn in_memory(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            artifact: None,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_parts(self) -> (Vec<u8>, Option<ScratchFile>) {
        (self.bytes, self.artifact)
    }
}

/// An engine bound to the parameters of one request.
#[derive(Debug, Clone)]
pub enum Backend {
    Local {
        engine: LocalEngine,
        scratch: ScratchDir,
        session: String,
    },
    Remote {
        engine: Arc<RemoteEngine>,
        voice: String,
    },
}

impl Backend {
    pub fn kind(&self) -> EngineKind {
        match self {
            Self::Local { .. } => EngineKind::Local,
            Self::Remote { .. } => EngineKind::Remote,
        }
    }

    /// Model identifier or voice name, for logs.
    pub fn name(&self) -> &str {
        match self {
            Self::Local { engine, .. } => engine.model_id(),
            Self::Remote { voice, .. } => voice,
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            Self::Local { .. } => FailurePolicy::AbortRequest,
            Self::Remote { .. } => FailurePolicy::SkipChunk,
        }
    }

    /// Per-request setup before the first chunk.
    pub async fn prepare(&self) {
        if let Self::Local {
            scratch, session, ..
        } = self
        {
            scratch.sweep_session(session).await;
        }
    }

    /// Produce one complete WAV file for chunk `index` (zero-based).
    pub async fn synthesize(&self, index: usize, text: &str) -> Result<AudioChunk, SynthesisError> {
        match self {
            Self::Local {
                engine,
                scratch,
                session,
            } => {
                let artifact = ScratchFile::new(scratch.chunk_path(session, index));
                engine
                    .synthesize_offloaded(text.to_string(), artifact.path().to_path_buf())
                    .await?;
                let bytes = artifact.read().await.map_err(|e| {
                    SynthesisError::LocalSynthesis(format!("cannot read chunk file: {e}"))
                })?;
                Ok(AudioChunk {
                    bytes,
                    artifact: Some(artifact),
                })
            }
            Self::Remote { engine, voice } => {
                engine.synthesize(text, voice).await.map(AudioChunk::in_memory)
            }
        }
    }
}
