//! One client connection: a sequential loop of synthesis requests.

use std::sync::atomic::Ordering;
use std::time::Instant;

use streamtts_core::{Backend, EngineKind, FailurePolicy, SynthesisError};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::protocol::{Status, SynthesisRequest};
use crate::state::AppState;
use crate::transport::{Inbound, Transport, TransportError};
use crate::validation::validate_text;

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reported to the client as a server error before closing.
    #[error("{0}")]
    Internal(String),
}

/// How a single request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Rejected before synthesis started.
    Rejected,
    /// The local model could not be loaded.
    ModelUnavailable,
    /// Every chunk was attempted, or the engine stopped after a failure.
    Completed { sent: usize, failed: usize },
}

/// Serve requests on `transport` until the client leaves or something breaks.
pub async fn run_session<T: Transport>(state: AppState, transport: &mut T) {
    let session_id = Uuid::new_v4().simple().to_string();
    state.metrics.sessions.fetch_add(1, Ordering::Relaxed);
    let span = info_span!("session", id = %session_id);
    serve(&state, &session_id, transport).instrument(span).await;
}

async fn serve<T: Transport>(state: &AppState, session_id: &str, transport: &mut T) {
    info!("Session opened");
    loop {
        let frame = match transport.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Client disconnected");
                break;
            }
            Err(e) => {
                warn!("Receive failed: {e}");
                break;
            }
        };

        let result = match frame {
            Inbound::Text(raw) => handle_message(state, session_id, transport, &raw).await,
            Inbound::Binary(_) => Err(SessionError::Internal(
                "binary messages are not accepted".to_string(),
            )),
        };

        match result {
            Ok(outcome) => debug!(?outcome, "Request finished"),
            Err(SessionError::Transport(e)) => {
                info!("Connection lost: {e}");
                break;
            }
            Err(SessionError::Internal(detail)) => {
                error!("Session failed: {detail}");
                let _ = transport
                    .send_text(Status::ServerError(&detail).to_string())
                    .await;
                transport.close().await;
                break;
            }
        }
    }
    info!("Session closed");
}

async fn send_status<T: Transport>(transport: &mut T, status: Status<'_>) -> Result<(), SessionError> {
    transport.send_text(status.to_string()).await?;
    Ok(())
}

/// Handle one JSON request from the client.
pub async fn handle_message<T: Transport>(
    state: &AppState,
    session_id: &str,
    transport: &mut T,
    raw: &str,
) -> Result<RequestOutcome, SessionError> {
    let request: SynthesisRequest = serde_json::from_str(raw)
        .map_err(|e| SessionError::Internal(format!("invalid request payload: {e}")))?;
    state.metrics.requests.fetch_add(1, Ordering::Relaxed);

    let text = match validate_text(&request.text, state.config.max_text_chars) {
        Ok(text) => text,
        Err(e) => {
            send_status(transport, Status::Failure(&e)).await?;
            return Ok(RequestOutcome::Rejected);
        }
    };

    let kind = match request.engine.as_deref().map(str::parse::<EngineKind>).transpose() {
        Ok(kind) => kind.unwrap_or_default(),
        Err(e) => {
            send_status(transport, Status::Failure(&e)).await?;
            return Ok(RequestOutcome::Rejected);
        }
    };

    send_status(transport, Status::Starting).await?;

    let backend = match kind {
        EngineKind::Local => {
            let model_id = non_empty(request.speaker).unwrap_or_else(|| state.config.default_model.clone());
            match state.registry.clone().resolve(model_id.clone()).await {
                Some(engine) => Backend::Local {
                    engine,
                    scratch: state.scratch.clone(),
                    session: session_id.to_string(),
                },
                None => {
                    let e = SynthesisError::ModelUnavailable(model_id);
                    send_status(transport, Status::Failure(&e)).await?;
                    return Ok(RequestOutcome::ModelUnavailable);
                }
            }
        }
        EngineKind::Remote => Backend::Remote {
            engine: state.remote.clone(),
            voice: non_empty(request.voice).unwrap_or_else(|| state.config.default_voice.clone()),
        },
    };

    info!(engine = kind.as_str(), name = backend.name(), chars = text.len(), "Synthesis started");
    let outcome = stream_chunks(state, transport, &backend, text).await?;
    send_status(transport, Status::Done).await?;
    Ok(outcome)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Synthesize and deliver every chunk of `text` in order.
async fn stream_chunks<T: Transport>(
    state: &AppState,
    transport: &mut T,
    backend: &Backend,
    text: &str,
) -> Result<RequestOutcome, SessionError> {
    backend.prepare().await;
    let metrics = state.metrics.engine(backend.kind());
    let (mut sent, mut failed) = (0, 0);

    for (index, chunk) in state.config.segmenter().segment(text).enumerate() {
        send_status(transport, Status::Progress { index, chunk: &chunk }).await?;

        let started = Instant::now();
        match backend.synthesize(index, &chunk).await {
            Ok(audio) => {
                metrics.record_chunk(started.elapsed().as_millis() as u64);
                // the scratch file, if any, goes away once the send is over
                let (bytes, _artifact) = audio.into_parts();
                transport.send_binary(bytes).await?;
                sent += 1;
            }
            Err(error) => {
                metrics.record_error();
                failed += 1;
                warn!(chunk = index + 1, kind = error.kind(), "Chunk failed: {error}");
                match backend.failure_policy() {
                    FailurePolicy::AbortRequest => {
                        send_status(transport, Status::Failure(&error)).await?;
                        break;
                    }
                    FailurePolicy::SkipChunk => {
                        send_status(transport, Status::ChunkFailure { index, error: &error }).await?;
                    }
                }
            }
        }
    }

    Ok(RequestOutcome::Completed { sent, failed })
}
