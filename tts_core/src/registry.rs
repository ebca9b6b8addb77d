//! Process-wide cache of loaded local models.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{error, info};

use crate::catalog::ModelCatalog;
use crate::device::ComputeDevice;
use crate::local::{LocalEngine, PiperVoice, SpeechModel};

/// Builds a model from its identifier. Blocking.
pub trait ModelLoader: Send + Sync {
    fn load(&self, model_id: &str) -> anyhow::Result<Arc<dyn SpeechModel>>;
}

/// Loads piper voices listed in a [`ModelCatalog`].
pub struct PiperLoader {
    catalog: Arc<ModelCatalog>,
    device: ComputeDevice,
}

impl PiperLoader {
    pub fn new(catalog: Arc<ModelCatalog>, device: ComputeDevice) -> Self {
        Self { catalog, device }
    }
}

impl ModelLoader for PiperLoader {
    fn load(&self, model_id: &str) -> anyhow::Result<Arc<dyn SpeechModel>> {
        let cfg_path = self
            .catalog
            .resolve(model_id)
            .ok_or_else(|| anyhow::anyhow!("unknown model '{model_id}'"))?;
        info!(model = model_id, device = %self.device, "Loading TTS model");
        let voice = PiperVoice::load(&cfg_path)?;
        Ok(Arc::new(voice))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub loaded: usize,
    pub hits: u64,
    pub misses: u64,
}

/// At most one engine per model identifier, shared by every session.
///
/// Loads run outside the engine map behind a per-identifier gate, so
/// concurrent first requests for one identifier wait for a single load while
/// readers of the map and loads of other identifiers proceed. Failed loads
/// are not cached and will be retried by the next request.
pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    engines: DashMap<String, LocalEngine>,
    gates: DashMap<String, Arc<Mutex<()>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ModelRegistry {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            engines: DashMap::new(),
            gates: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn cached(&self, model_id: &str) -> Option<LocalEngine> {
        let engine = self.engines.get(model_id).map(|e| e.value().clone());
        if engine.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        engine
    }

    /// Return the cached engine for `model_id`, loading it on first use.
    ///
    /// Blocks while loading. `None` means the model could not be constructed;
    /// the cause is logged.
    pub fn get_engine(&self, model_id: &str) -> Option<LocalEngine> {
        if let Some(engine) = self.cached(model_id) {
            return Some(engine);
        }

        let gate = self.gates.entry(model_id.to_string()).or_default().clone();
        let _loading = gate.lock().unwrap_or_else(PoisonError::into_inner);

        // another caller may have finished the load while we waited
        if let Some(engine) = self.cached(model_id) {
            return Some(engine);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match self.loader.load(model_id) {
            Ok(model) => {
                let engine = LocalEngine::new(model_id, model);
                info!(model = model_id, sample_rate = engine.sample_rate(), "TTS model loaded");
                self.engines.insert(model_id.to_string(), engine.clone());
                Some(engine)
            }
            Err(e) => {
                error!(model = model_id, "Failed to load TTS model: {e:#}");
                None
            }
        }
    }

    /// [`get_engine`](Self::get_engine) on the blocking pool.
    pub async fn resolve(self: Arc<Self>, model_id: String) -> Option<LocalEngine> {
        match tokio::task::spawn_blocking(move || self.get_engine(&model_id)).await {
            Ok(engine) => engine,
            Err(e) => {
                error!("Model load task failed: {e}");
                None
            }
        }
    }

    /// Load `model_id` ahead of the first request. Returns whether it is usable.
    pub fn warm(&self, model_id: &str) -> bool {
        self.get_engine(model_id).is_some()
    }

    /// Whether `model_id` is loaded. Never waits on an in-progress load.
    pub fn is_loaded(&self, model_id: &str) -> bool {
        self.engines.contains_key(model_id)
    }

    pub fn loaded_models(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.engines.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            loaded: self.engines.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
