//! Data structures flowing between the per-file phase and the optimization phase.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::output::ContentHash;
use crate::paths::{normalize_path, split_query};
use crate::transform::{AssetStrategy, ContentFormat};

/// A file handed to the orchestrator by the module graph walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
  /// Project relative path with forward slashes.
  pub path: String,
  /// Raw file content.
  pub content: Vec<u8>,
  /// Entries whose dependency graph reaches this file; empty means every entry.
  pub reached_from: BTreeSet<String>,
  /// Location on disk, used to install untouched files without rewriting them.
  pub origin: Option<PathBuf>,
}

impl SourceFile {
  /// Create a file reached from every entry.
  pub fn new(path: &str, content: impl Into<Vec<u8>>) -> Self {
    Self {
      path: normalize_path(path),
      content: content.into(),
      reached_from: BTreeSet::new(),
      origin: None,
    }
  }

  /// Restrict the file to the given entries.
  pub fn reached_from<I, S>(mut self, entries: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.reached_from = entries.into_iter().map(Into::into).collect();
    self
  }

  /// Record where the file lives on disk.
  pub fn with_origin(mut self, origin: PathBuf) -> Self {
    self.origin = Some(origin);
    self
  }

  /// Size in bytes.
  pub fn size(&self) -> u64 {
    self.content.len() as u64
  }
}

/// How a transformed file takes part in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleClass {
  /// Bundled into script chunks.
  Script,
  /// Extracted into stylesheet files.
  Style,
  /// Emitted as its own file with a rule or media template.
  Media,
  /// Copied through unmodified.
  Asset,
}

/// Result of the per-file phase for one source file.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
  /// Project relative path.
  pub path: String,
  /// Rules that contributed steps.
  pub rules: Vec<String>,
  /// Delivery strategy of the chain.
  pub strategy: AssetStrategy,
  /// Classification used by chunk assembly.
  pub class: ModuleClass,
  /// Format of the final content.
  pub format: ContentFormat,
  /// Content after every step ran.
  pub content: Vec<u8>,
  /// Hash of the original file content.
  pub source_hash: ContentHash,
  /// Entries reaching the file; empty means every entry.
  pub reached_from: BTreeSet<String>,
  /// Location on disk when the content is untouched.
  pub origin: Option<PathBuf>,
  /// Filename template override from the primary rule.
  pub output: Option<String>,
  /// Non-fatal findings reported by the steps.
  pub warnings: Vec<String>,
}

/// Category of an emitted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
  /// Entry or shared script chunk.
  Script,
  /// Extracted stylesheet.
  Style,
  /// Emitted image, font or other media.
  Media,
  /// File copied through without a matching rule.
  Asset,
  /// Per-entry runtime chunk.
  Runtime,
  /// Source map of a script chunk.
  SourceMap,
  /// Generated HTML entry document.
  Html,
  /// Asset manifest.
  Manifest,
}

/// A named output file held in memory until it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  /// Output path relative to the output directory; may end with a query string.
  pub path: String,
  /// Category of the artifact.
  pub kind: ArtifactKind,
  /// Logical source: chunk name or module path.
  pub source: String,
  /// Final content.
  pub content: Vec<u8>,
  /// Hash of `content`.
  pub hash: ContentHash,
  /// Whether a minimizer processed the content.
  pub minimized: bool,
  /// Original file when the content is byte-identical to it.
  pub origin: Option<PathBuf>,
}

impl Artifact {
  /// Create an artifact, hashing its content.
  pub fn new(
    path: String,
    kind: ArtifactKind,
    source: impl Into<String>,
    content: Vec<u8>,
  ) -> Self {
    let hash = ContentHash::of(&content);
    Self {
      path,
      kind,
      source: source.into(),
      content,
      hash,
      minimized: false,
      origin: None,
    }
  }

  /// Path on disk, without any query string.
  pub fn file_path(&self) -> &str {
    split_query(&self.path).0
  }

  /// Size in bytes.
  pub fn size(&self) -> u64 {
    self.content.len() as u64
  }
}

/// Category of a non-fatal finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
  /// Reported by a lint step.
  Lint,
  /// An artifact exceeds the configured size hint.
  OversizedAsset,
  /// An exclusion pattern never matched any input path.
  UnusedExclusion,
}

/// Non-fatal finding collected during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildWarning {
  /// Category.
  pub kind: WarningKind,
  /// File, artifact or rule the finding is about.
  pub source: String,
  /// Human readable description.
  pub message: String,
}

impl BuildWarning {
  /// Create a warning.
  pub fn new(kind: WarningKind, source: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      kind,
      source: source.into(),
      message: message.into(),
    }
  }
}

impl fmt::Display for BuildWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.source, self.message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn source_files_normalise_their_paths() {
    let file = SourceFile::new(".\\src\\main.js", "x").reached_from(["main"]);
    assert_eq!(file.path, "src/main.js");
    assert_eq!(file.size(), 1);
    assert!(file.reached_from.contains("main"));
  }

  #[test]
  fn artifact_file_paths_drop_queries() {
    let artifact = Artifact::new(
      "static/imgs/abcd1234.png?v=2".into(),
      ArtifactKind::Media,
      "src/logo.png?v=2",
      b"png".to_vec(),
    );
    assert_eq!(artifact.file_path(), "static/imgs/abcd1234.png");
    assert_eq!(artifact.hash, ContentHash::of(b"png"));
  }
}
