use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{Request, State, WebSocketUpgrade},
    http::{HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use streamtts_core::remote::VOICES;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::metrics::{system_metrics, EngineMetricsResponse, MetricsResponse, SessionStats};
use crate::session::run_session;
use crate::state::AppState;
use crate::transport::WsTransport;
use crate::validation::validate_model_id;

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .flatten()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        if config.cors_allowed_origins.is_some() {
            warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
        } else {
            warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        }
        base.allow_origin(Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(AllowOrigin::list(origins))
    }
}

async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert("x-request-id", value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert("x-request-id", value);
        response
    } else {
        next.run(request).await
    }
}

async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    next.run(request).await
}

/// Build the HTTP application: websocket endpoint, health, catalog and metrics.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let config = &state.config;

    // One bucket shared by every client
    let per_second = (config.rate_limit_per_minute / 60).max(1) as u64;
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(per_second)
            .burst_size(config.rate_limit_per_minute.max(1))
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );
    info!("Rate limiting: {} requests per minute", config.rate_limit_per_minute);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(config))
        .into_inner();

    let public_api = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/speakers", get(list_speakers))
        .route("/voices", get(list_voices))
        .route("/models/warm", post(warm_model));

    // Metrics endpoint - consider adding authentication in production
    let metrics_api = Router::new().route("/metrics", get(metrics_endpoint));

    let api = Router::new().merge(public_api).merge(metrics_api);

    Ok(Router::new()
        .merge(api.clone()) // root paths
        .nest("/api", api) // /api prefix
        .layer(axum::middleware::from_fn_with_state(state.clone(), count_requests))
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state))
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let mut transport = WsTransport::new(socket);
        run_session(state, &mut transport).await;
    })
}

pub async fn health_check() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpeakerInfo {
    pub id: String,
    pub name: String,
    pub loaded: bool,
}

pub async fn list_speakers(State(state): State<AppState>) -> Json<Vec<SpeakerInfo>> {
    let speakers = state
        .catalog
        .entries()
        .map(|entry| SpeakerInfo {
            id: entry.id.clone(),
            name: entry.name().to_string(),
            loaded: state.registry.is_loaded(&entry.id),
        })
        .collect();
    Json(speakers)
}

pub async fn list_voices() -> Json<Vec<&'static str>> {
    Json(VOICES.to_vec())
}

#[derive(Debug, Deserialize)]
pub struct WarmRequest {
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WarmResponse {
    pub model: String,
    pub loaded: bool,
}

pub async fn warm_model(
    State(state): State<AppState>,
    Json(req): Json<WarmRequest>,
) -> Result<Json<WarmResponse>, ApiError> {
    let model = validate_model_id(&req.model)?.to_string();

    let registry = state.registry.clone();
    let id = model.clone();
    let loaded = tokio::task::spawn_blocking(move || registry.warm(&id))
        .await
        .map_err(|e| ApiError::InternalError(format!("warm task failed: {e}")))?;

    if loaded {
        Ok(Json(WarmResponse { model, loaded }))
    } else {
        Err(ApiError::ModelUnavailable(model))
    }
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    let metrics = &state.metrics;
    Json(MetricsResponse {
        timestamp: Utc::now(),
        system: system_metrics(
            state.request_count.load(Ordering::Relaxed),
            metrics.uptime_seconds(),
        ),
        sessions: SessionStats {
            sessions_opened: metrics.sessions.load(Ordering::Relaxed),
            synthesis_requests: metrics.requests.load(Ordering::Relaxed),
        },
        engines: EngineMetricsResponse {
            local: metrics.local.stats(),
            remote: metrics.remote.stats(),
        },
        model_cache: state.registry.cache_stats(),
        loaded_models: state.registry.loaded_models(),
    })
}
