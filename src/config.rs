//! Pipeline configuration loader describing rules, output naming and optimization.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::html::HtmlConfig;
use crate::mode::BuildMode;
use crate::optimize::OptimizationConfig;
use crate::output::{HashLengths, OutputTemplates};
use crate::rules::{RuleConfig, default_rules};

/// Configuration file names searched for, in order, by [`PipelineConfig::discover`].
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
  "pipeline.config.json",
  "pipeline.config.yaml",
  "pipeline.config.yml",
];

/// Default byte threshold below which images are inlined as data URIs.
pub const DEFAULT_INLINE_THRESHOLD: u64 = 10 * 1024;

/// Static configuration document loaded once at build start.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
  /// Ordered rule table.
  pub rules: Vec<RuleConfig>,
  /// Filename templates for each naming surface.
  pub output_templates: OutputTemplates,
  /// Default hash lengths for each naming surface.
  pub hash_lengths: HashLengths,
  /// Theme customisation values merged verbatim into steps that reference `$theme`.
  pub theme_overrides: BTreeMap<String, String>,
  /// Byte threshold used by asset rules without their own `inlineBelow`.
  pub inline_threshold: u64,
  /// Minimizer names, runtime chunk naming and image optimizer directives.
  pub optimization: OptimizationConfig,
  /// Generated HTML entry document.
  pub html: HtmlConfig,
  /// Oversized asset notices.
  pub performance: PerformanceConfig,
  /// Output directory handling.
  pub output: OutputConfig,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    let mut theme_overrides = BTreeMap::new();
    theme_overrides.insert("@primary-color".to_string(), "#1DA57A".to_string());

    Self {
      rules: default_rules(),
      output_templates: OutputTemplates::default(),
      hash_lengths: HashLengths::default(),
      theme_overrides,
      inline_threshold: DEFAULT_INLINE_THRESHOLD,
      optimization: OptimizationConfig::default(),
      html: HtmlConfig::default(),
      performance: PerformanceConfig::default(),
      output: OutputConfig::default(),
    }
  }
}

/// Oversized asset notice settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceConfig {
  /// Emit warnings for artifacts larger than `max_asset_size`.
  pub hints: bool,
  /// Size in bytes above which an artifact is reported.
  pub max_asset_size: u64,
}

impl Default for PerformanceConfig {
  fn default() -> Self {
    Self {
      hints: false,
      max_asset_size: 250 * 1024,
    }
  }
}

/// Output directory handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
  /// Remove files from the output directory that the build did not emit.
  pub clean: bool,
}

impl Default for OutputConfig {
  fn default() -> Self {
    Self { clean: true }
  }
}

impl PipelineConfig {
  /// Load configuration from the first candidate file found in `root`.
  ///
  /// A missing file yields the built-in defaults; a file that exists but fails to parse is
  /// a configuration error so a typo never silently falls back to defaults.
  pub fn discover(root: &Path) -> ConfigResult<Self> {
    for candidate in CONFIG_FILE_CANDIDATES {
      let path = root.join(candidate);
      if path.is_file() {
        debug!(path = %path.display(), "loading pipeline configuration");
        return Self::from_path(&path);
      }
    }

    debug!(root = %root.display(), "no pipeline configuration found, using defaults");
    Ok(Self::default())
  }

  /// Read configuration from a specific JSON or YAML file.
  pub fn from_path(path: &Path) -> ConfigResult<Self> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
      Some("json") => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
      }),
      Some("yaml") | Some("yml") => {
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
          path: path.to_path_buf(),
          source,
        })
      }
      _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
  }

  /// Path of the HTML template relative to `root`, when one is configured.
  pub fn html_template_path(&self, root: &Path) -> Option<PathBuf> {
    self.html.template.as_ref().map(|template| root.join(template))
  }
}

/// Immutable build-wide state threaded through every component call.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
  /// Mode of the current build.
  pub mode: BuildMode,
  /// Static configuration document.
  pub config: &'a PipelineConfig,
}

impl<'a> BuildContext<'a> {
  /// Create a context for one build invocation.
  pub fn new(config: &'a PipelineConfig, mode: BuildMode) -> Self {
    Self { mode, config }
  }

  /// Theme overrides merged into `$theme` references.
  pub fn theme_overrides(&self) -> &'a BTreeMap<String, String> {
    &self.config.theme_overrides
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn discover_falls_back_to_defaults() {
    let temp = tempdir().expect("failed to create temp dir");
    let config = PipelineConfig::discover(temp.path()).expect("defaults should load");
    assert_eq!(config.inline_threshold, DEFAULT_INLINE_THRESHOLD);
    assert_eq!(
      config.theme_overrides.get("@primary-color").map(String::as_str),
      Some("#1DA57A")
    );
    assert!(!config.rules.is_empty());
  }

  #[test]
  fn discover_reads_partial_json() {
    let temp = tempdir().expect("failed to create temp dir");
    fs::write(
      temp.path().join("pipeline.config.json"),
      r##"{"inlineThreshold": 2048, "themeOverrides": {"@primary-color": "#FF0000"}}"##,
    )
    .expect("failed to write config");

    let config = PipelineConfig::discover(temp.path()).expect("config should parse");
    assert_eq!(config.inline_threshold, 2048);
    assert_eq!(config.theme_overrides["@primary-color"], "#FF0000");
    assert_eq!(config.rules.len(), default_rules().len());
  }

  #[test]
  fn reads_yaml_documents() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join("pipeline.config.yml");
    fs::write(&path, "inlineThreshold: 512\noutput:\n  clean: false\n").expect("write");

    let config = PipelineConfig::from_path(&path).expect("yaml should parse");
    assert_eq!(config.inline_threshold, 512);
    assert!(!config.output.clean);
  }

  #[test]
  fn malformed_files_are_errors() {
    let temp = tempdir().expect("failed to create temp dir");
    fs::write(temp.path().join("pipeline.config.json"), "{ not json").expect("write");

    let err = PipelineConfig::discover(temp.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Json { .. }));
  }

  #[test]
  fn rejects_unknown_extensions() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join("pipeline.config.toml");
    fs::write(&path, "").expect("write");
    assert!(matches!(
      PipelineConfig::from_path(&path),
      Err(ConfigError::UnsupportedFormat(_))
    ));
  }
}
