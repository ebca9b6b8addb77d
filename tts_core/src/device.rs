//! Compute device selection for local models.
//!
//! piper-rs builds its ONNX Runtime sessions from the global environment, so
//! the device is chosen once, before the first model loads, by registering
//! the matching execution provider there.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cuda,
    Cpu,
}

impl ComputeDevice {
    /// Pick CUDA when an NVIDIA driver is visible, otherwise the CPU.
    pub fn detect() -> Self {
        let driver = Path::new("/proc/driver/nvidia/version").exists();
        if driver || std::env::var_os("CUDA_PATH").is_some() {
            Self::Cuda
        } else {
            Self::Cpu
        }
    }

    /// Resolve a configured preference: `cpu`, `cuda`/`gpu`, anything else means auto.
    pub fn from_preference(pref: &str) -> Self {
        match pref.trim().to_ascii_lowercase().as_str() {
            "cpu" => Self::Cpu,
            "cuda" | "gpu" => Self::Cuda,
            _ => Self::detect(),
        }
    }

    /// Register this device with ONNX Runtime. Returns the device actually in use.
    pub fn activate(self) -> Self {
        match self {
            Self::Cpu => {
                info!("Using device: cpu");
                Self::Cpu
            }
            Self::Cuda => {
                let provider = ort::execution_providers::CUDAExecutionProvider::default().build();
                match ort::init().with_execution_providers([provider]).commit() {
                    Ok(_) => {
                        info!("Using device: cuda");
                        Self::Cuda
                    }
                    Err(e) => {
                        warn!("CUDA execution provider unavailable ({e}), falling back to cpu");
                        Self::Cpu
                    }
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_preferences() {
        assert_eq!(ComputeDevice::from_preference("cpu"), ComputeDevice::Cpu);
        assert_eq!(ComputeDevice::from_preference(" CUDA "), ComputeDevice::Cuda);
        assert_eq!(ComputeDevice::from_preference("gpu"), ComputeDevice::Cuda);
        assert_eq!(ComputeDevice::from_preference("auto"), ComputeDevice::detect());
    }
}
