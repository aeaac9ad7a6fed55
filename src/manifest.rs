//! The asset manifest mapping logical names to emitted files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::mode::BuildMode;

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE: &str = "asset-manifest.json";

/// Serialised description of one build's output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
  /// Mode the output was built in.
  pub mode: BuildMode,
  /// Logical name (`main.js`, `src/logo.png`) to emitted path.
  #[serde(default)]
  pub files: BTreeMap<String, String>,
  /// Entry name to the files it loads, in load order.
  #[serde(default)]
  pub entrypoints: BTreeMap<String, Vec<String>>,
}

impl AssetManifest {
  /// Empty manifest for `mode`.
  pub fn new(mode: BuildMode) -> Self {
    Self {
      mode,
      files: BTreeMap::new(),
      entrypoints: BTreeMap::new(),
    }
  }

  /// Record an emitted file.
  pub fn add_file(&mut self, logical: impl Into<String>, path: impl Into<String>) {
    self.files.insert(logical.into(), path.into());
  }

  /// Record the files an entry loads.
  pub fn add_entrypoint(&mut self, entry: impl Into<String>, files: Vec<String>) {
    self.entrypoints.insert(entry.into(), files);
  }

  /// Pretty printed JSON.
  pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
    let mut json = serde_json::to_vec_pretty(self)?;
    json.push(b'\n');
    Ok(json)
  }
}

/// Load a manifest written by a previous build.
pub fn load_manifest(path: &Path) -> Result<AssetManifest> {
  let content = fs::read_to_string(path)
    .with_context(|| format!("manifest not found at {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse asset manifest {}", path.display()))
}
