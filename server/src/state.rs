use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use anyhow::Context;
use streamtts_core::{
    ComputeDevice, ModelCatalog, ModelRegistry, PiperLoader, RemoteEngine, ScratchDir,
};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::metrics::AppMetrics;

/// Shared by every route and session.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub catalog: Arc<ModelCatalog>,
    pub remote: Arc<RemoteEngine>,
    pub scratch: ScratchDir,
    pub metrics: AppMetrics,
    pub request_count: Arc<AtomicU64>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        catalog: Arc<ModelCatalog>,
        registry: Arc<ModelRegistry>,
        remote: RemoteEngine,
        scratch: ScratchDir,
    ) -> Self {
        Self {
            registry,
            catalog,
            remote: Arc::new(remote),
            scratch,
            metrics: AppMetrics::new(),
            request_count: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Build the production state: device, catalog, scratch directory, engines.
    pub fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let device = ComputeDevice::from_preference(&config.device).activate();

        let catalog = Arc::new(
            ModelCatalog::from_map_file(&config.model_map).unwrap_or_else(|e| {
                warn!("Could not load {}: {e:#}, using empty catalog.", config.model_map.display());
                ModelCatalog::default()
            }),
        );
        info!("Loaded {} TTS model entries", catalog.len());

        let scratch = ScratchDir::create(&config.scratch_dir).with_context(|| {
            format!("Failed to create scratch dir {}", config.scratch_dir.display())
        })?;
        let swept = scratch.sweep_all();
        if swept > 0 {
            info!("Removed {swept} stale chunk file(s)");
        }

        let remote = RemoteEngine::new(config.remote_config())?;
        info!("Remote TTS model: {}", remote.model());
        if !remote.has_credential() {
            warn!("GOOGLE_API_KEY not set, the google engine will report a configuration error");
        }

        let registry = Arc::new(ModelRegistry::new(PiperLoader::new(catalog.clone(), device)));
        Ok(Self::new(config, catalog, registry, remote, scratch))
    }
}
