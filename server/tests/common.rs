//! Common utilities for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use streamtts_core::{
    CatalogEntry, ModelCatalog, ModelLoader, ModelRegistry, RemoteEngine, ScratchDir, SpeechModel,
};
use streamtts_server::{build_router, AppState, ServerConfig};

pub const GOOD_MODEL: &str = "test/voice";
pub const BROKEN_MODEL: &str = "test/broken";

/// Half a second of silence per chunk; fails on text containing "FAIL".
pub struct SilentModel;

impl SpeechModel for SilentModel {
    fn sample_rate(&self) -> u32 {
        22_050
    }

    fn synthesize(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if text.contains("FAIL") {
            anyhow::bail!("synthetic failure");
        }
        Ok(vec![0.0; 11_025])
    }
}

pub struct TestLoader;

impl ModelLoader for TestLoader {
    fn load(&self, model_id: &str) -> anyhow::Result<Arc<dyn SpeechModel>> {
        if model_id == BROKEN_MODEL {
            anyhow::bail!("weights not found");
        }
        Ok(Arc::new(SilentModel))
    }
}

pub fn test_config(scratch: &Path) -> ServerConfig {
    ServerConfig {
        default_model: GOOD_MODEL.to_string(),
        scratch_dir: scratch.to_path_buf(),
        rate_limit_per_minute: 600,
        ..ServerConfig::default()
    }
}

pub fn test_state(config: ServerConfig) -> AppState {
    let catalog = Arc::new(ModelCatalog::new([
        CatalogEntry {
            id: GOOD_MODEL.to_string(),
            config: "models/test/voice.onnx.json".into(),
            display_name: Some("Test Voice".to_string()),
        },
        CatalogEntry::new(BROKEN_MODEL, "models/test/broken.onnx.json"),
    ]));
    let remote = RemoteEngine::new(config.remote_config()).unwrap();
    let scratch = ScratchDir::create(&config.scratch_dir).unwrap();
    AppState::new(
        config,
        catalog,
        Arc::new(ModelRegistry::new(TestLoader)),
        remote,
        scratch,
    )
}

/// Create a test app instance
pub fn create_test_app(scratch: &Path) -> (Router, AppState) {
    let state = test_state(test_config(scratch));
    let app = build_router(state.clone()).unwrap();
    (app, state)
}
