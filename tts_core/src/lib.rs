//! Text segmentation and speech synthesis engines for the streaming server.

pub mod backend;
pub mod catalog;
pub mod device;
pub mod error;
pub mod local;
pub mod registry;
pub mod remote;
pub mod scratch;
pub mod segment;
pub mod wav;

pub use backend::{AudioChunk, Backend, EngineKind, FailurePolicy};
pub use catalog::{CatalogEntry, ModelCatalog};
pub use device::ComputeDevice;
pub use error::SynthesisError;
pub use local::{LocalEngine, PiperVoice, SpeechModel};
pub use registry::{CacheStats, ModelLoader, ModelRegistry, PiperLoader};
pub use remote::{RemoteConfig, RemoteEngine};
pub use scratch::{ScratchDir, ScratchFile};
pub use segment::{segment, Segmenter};
