use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

/// One local model the server knows how to load.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub config: PathBuf,
    pub display_name: Option<String>,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, config: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            config: config.into(),
            display_name: None,
        }
    }

    /// Human readable name, falling back to the identifier.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Model identifier -> piper voice config.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    entries: BTreeMap<String, CatalogEntry>,
    /// Direct config paths are only accepted below this directory.
    root: Option<PathBuf>,
}

impl ModelCatalog {
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
            root: None,
        }
    }

    /// Allow identifiers naming a config file under `root`.
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = fs::canonicalize(root.as_ref()).ok();
        self
    }

    /// Load from a map file such as `models/map.json`.
    ///
    /// Each key is a model identifier; the value is either the config path or
    /// an object with `config` and an optional `display_name`. The directory
    /// holding the map becomes the root for direct config paths.
    pub fn from_map_file<P: AsRef<Path>>(p: P) -> anyhow::Result<Self> {
        let path = p.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let catalog = Self::from_json(&text)?;
        Ok(match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => catalog.with_root(dir),
            _ => catalog.with_root("."),
        })
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let json: serde_json::Value =
            serde_json::from_str(text).with_context(|| "model map is not valid JSON")?;
        let obj = json
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("model map must be a JSON object"))?;

        let mut entries = Vec::with_capacity(obj.len());
        for (id, v) in obj {
            let entry = match v {
                serde_json::Value::String(path) => CatalogEntry::new(id.clone(), path),
                serde_json::Value::Object(o) => {
                    let config = o
                        .get("config")
                        .and_then(|x| x.as_str())
                        .ok_or_else(|| anyhow::anyhow!("missing 'config' for model {}", id))?;
                    CatalogEntry {
                        id: id.clone(),
                        config: PathBuf::from(config),
                        display_name: o
                            .get("display_name")
                            .and_then(|x| x.as_str())
                            .map(str::to_owned),
                    }
                }
                _ => {
                    return Err(anyhow::anyhow!(
                        "invalid entry for model {} (expected string or object)",
                        id
                    ));
                }
            };
            entries.push(entry);
        }
        Ok(Self::new(entries))
    }

    /// Config path for a model identifier.
    ///
    /// Identifiers missing from the catalog are accepted when they name an
    /// existing `*.onnx.json` file inside the catalog root.
    pub fn resolve(&self, model_id: &str) -> Option<PathBuf> {
        if let Some(entry) = self.entries.get(model_id) {
            return Some(entry.config.clone());
        }
        let root = self.root.as_deref()?;
        if !model_id.ends_with(".onnx.json") {
            return None;
        }
        let direct = fs::canonicalize(model_id).ok()?;
        (direct.starts_with(root) && direct.is_file()).then_some(direct)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
