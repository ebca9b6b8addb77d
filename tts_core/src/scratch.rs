//! Temporary per-chunk WAV files produced by local synthesis.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

const PREFIX: &str = "chunk_";
const EXTENSION: &str = ".wav";

#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Use `root`, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `chunk_{session}_{index}.wav`
    pub fn chunk_path(&self, session: &str, index: usize) -> PathBuf {
        self.root.join(format!("{PREFIX}{session}_{index}{EXTENSION}"))
    }

    /// Remove every leftover chunk file. Run once at startup.
    pub fn sweep_all(&self) -> usize {
        self.sweep(|_| true)
    }

    /// Remove leftovers from one session before it starts writing.
    pub async fn sweep_session(&self, session: &str) -> usize {
        let dir = self.clone();
        let prefix = format!("{PREFIX}{session}_");
        tokio::task::spawn_blocking(move || dir.sweep(|name| name.starts_with(&prefix)))
            .await
            .unwrap_or(0)
    }

    fn sweep(&self, matches: impl Fn(&str) -> bool) -> usize {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.root.display(), "Cannot list scratch directory: {e}");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !(name.starts_with(PREFIX) && name.ends_with(EXTENSION) && matches(name)) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = name, "Failed to remove stale chunk file: {e}"),
            }
        }
        if removed > 0 {
            debug!(removed, "Swept scratch files");
        }
        removed
    }
}

/// A chunk file that is deleted when dropped, whether or not it was sent.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(file = %self.path.display(), "Failed to remove chunk file: {e}");
            }
        }
    }
}
