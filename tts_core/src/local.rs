//! In-process neural synthesis.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use piper_rs::synth::{PiperSpeechStreamParallel, PiperSpeechSynthesizer};

use crate::error::SynthesisError;
use crate::wav;

/// A loaded model that turns text into f32 samples.
///
/// Implementations block for the duration of a call and are expected to be
/// driven from a blocking worker, never from an async task directly.
pub trait SpeechModel: Send + Sync {
    fn sample_rate(&self) -> u32;

    fn synthesize(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// A piper voice loaded from its `.onnx.json` config.
pub struct PiperVoice {
    synth: RwLock<PiperSpeechSynthesizer>,
    sample_rate: u32,
}

// PiperSpeechSynthesizer doesn't implement Debug
impl std::fmt::Debug for PiperVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiperVoice")
            .field("synth", &"<PiperSpeechSynthesizer>")
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl PiperVoice {
    pub fn load<P: AsRef<Path>>(cfg_path: P) -> anyhow::Result<Self> {
        let sample_rate = read_sample_rate(&cfg_path)?;
        let model = piper_rs::from_config_path(cfg_path.as_ref())
            .map_err(|e| anyhow::anyhow!("piper load error: {e}"))?;
        let synth = PiperSpeechSynthesizer::new(model)?;
        Ok(Self {
            synth: RwLock::new(synth),
            sample_rate,
        })
    }
}

impl SpeechModel for PiperVoice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn synthesize(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let synth = self.synth.read().map_err(|_| {
            anyhow::anyhow!("Synthesizer lock poisoned - a previous synthesis panicked")
        })?;

        let iter: PiperSpeechStreamParallel = synth
            .synthesize_parallel(text.to_string(), None)
            .map_err(|e| anyhow::anyhow!("piper synth error: {e}"))?;

        let mut samples: Vec<f32> = Vec::new();
        for part in iter {
            samples.extend(part.map_err(|e| anyhow::anyhow!("chunk error: {e}"))?.into_vec());
        }
        Ok(samples)
    }
}

/// Read `audio.sample_rate` from a piper model config.
pub fn read_sample_rate<P: AsRef<Path>>(cfg_path: P) -> anyhow::Result<u32> {
    let text = fs::read_to_string(cfg_path.as_ref())
        .with_context(|| format!("Failed to read config file: {}", cfg_path.as_ref().display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| "Config file is not valid JSON")?;

    let sample_rate = json
        .get("audio")
        .and_then(|a| a.get("sample_rate"))
        .and_then(|sr| sr.as_u64())
        .ok_or_else(|| anyhow::anyhow!("Missing or invalid 'audio.sample_rate' in config"))?;

    u32::try_from(sample_rate).context("sample rate out of range")
}

/// Handle to a cached local model.
///
/// Cloning is cheap; every clone refers to the same loaded model.
#[derive(Clone)]
pub struct LocalEngine {
    model_id: Arc<str>,
    model: Arc<dyn SpeechModel>,
}

impl std::fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEngine")
            .field("model_id", &self.model_id)
            .field("sample_rate", &self.model.sample_rate())
            .finish()
    }
}

impl LocalEngine {
    pub fn new(model_id: &str, model: Arc<dyn SpeechModel>) -> Self {
        Self {
            model_id: Arc::from(model_id),
            model,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn sample_rate(&self) -> u32 {
        self.model.sample_rate()
    }

    /// Whether both handles share one loaded model.
    pub fn same_instance(&self, other: &LocalEngine) -> bool {
        Arc::ptr_eq(&self.model, &other.model)
    }

    /// Synthesize `text` and write it to `destination` as WAV. Blocks.
    pub fn synthesize_to_file(&self, text: &str, destination: &Path) -> Result<(), SynthesisError> {
        let samples = self
            .model
            .synthesize(text)
            .map_err(|e| SynthesisError::LocalSynthesis(format!("{e:#}")))?;
        wav::write_wav_file(destination, &samples, self.model.sample_rate())
            .map_err(|e| SynthesisError::LocalSynthesis(format!("wav write error: {e}")))
    }

    /// Same as [`synthesize_to_file`](Self::synthesize_to_file), on the blocking pool.
    pub async fn synthesize_offloaded(
        &self,
        text: String,
        destination: PathBuf,
    ) -> Result<(), SynthesisError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.synthesize_to_file(&text, &destination))
            .await
            .map_err(|e| SynthesisError::LocalSynthesis(format!("synthesis task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tone;

    impl SpeechModel for Tone {
        fn sample_rate(&self) -> u32 {
            16_000
        }

        fn synthesize(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            if text.contains("boom") {
                anyhow::bail!("model exploded");
            }
            Ok(vec![0.25; text.len() * 10])
        }
    }

    #[test]
    fn test_sample_rate_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.onnx.json");
        fs::write(&good, r#"{"audio": {"sample_rate": 22050}}"#).unwrap();
        assert_eq!(read_sample_rate(&good).unwrap(), 22_050);

        let bad = dir.path().join("bad.onnx.json");
        fs::write(&bad, r#"{"audio": {}}"#).unwrap();
        assert!(read_sample_rate(&bad).is_err());
        assert!(read_sample_rate(dir.path().join("absent.json")).is_err());
    }

    #[tokio::test]
    async fn test_offloaded_synthesis_writes_wav() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("chunk_0.wav");
        let engine = LocalEngine::new("tone", Arc::new(Tone));

        engine.synthesize_offloaded("hello".into(), dest.clone()).await.unwrap();

        let reader = hound::WavReader::open(&dest).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.len(), 50);
    }

    #[tokio::test]
    async fn test_failure_carries_model_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LocalEngine::new("tone", Arc::new(Tone));

        let err = engine
            .synthesize_offloaded("boom".into(), dir.path().join("x.wav"))
            .await
            .unwrap_err();
        match err {
            SynthesisError::LocalSynthesis(detail) => assert!(detail.contains("model exploded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_clones_share_instance() {
        let engine = LocalEngine::new("tone", Arc::new(Tone));
        let other = LocalEngine::new("tone", Arc::new(Tone));
        assert!(engine.same_instance(&engine.clone()));
        assert!(!engine.same_instance(&other));
    }
}
