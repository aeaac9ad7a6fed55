//! Error types for configuration loading and pipeline runs.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration handling.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result alias for build runs.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Fatal configuration problems, reported before any file is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// A rule pattern failed to compile.
  #[error("rule `{rule}` has an invalid pattern `{pattern}`: {source}")]
  InvalidPattern {
    /// Name of the offending rule.
    rule: String,
    /// Raw pattern text.
    pattern: String,
    /// Underlying regex or glob error.
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// A rule carries no test, extension list or glob.
  #[error("rule `{0}` has no test, extensions or glob")]
  EmptyPattern(String),

  /// Two rules share a name.
  #[error("duplicate rule name `{0}`")]
  DuplicateRule(String),

  /// A chain step names a transform that is not registered.
  #[error("rule `{rule}` references unknown transform `{step}`")]
  UnknownTransform {
    /// Name of the rule holding the step.
    rule: String,
    /// Unresolved step name.
    step: String,
  },

  /// The optimization section names a minimizer that is not registered.
  #[error("unknown minimizer `{0}`")]
  UnknownMinimizer(String),

  /// An output template is malformed.
  #[error("invalid output template `{template}`: {reason}")]
  InvalidTemplate {
    /// Raw template text.
    template: String,
    /// Human readable reason.
    reason: String,
  },

  /// Production builds must write somewhere.
  #[error("production builds require an output directory")]
  MissingOutputDir,

  /// No entry point was supplied.
  #[error("no entry points specified")]
  NoEntries,

  /// An entry point is not part of the input file set.
  #[error("entry `{name}` points at `{path}` which is not among the input files")]
  EntryNotFound {
    /// Entry name.
    name: String,
    /// Entry module path.
    path: String,
  },

  /// The configuration file extension is not JSON or YAML.
  #[error("unsupported configuration format: {}", .0.display())]
  UnsupportedFormat(PathBuf),

  /// Failed to parse a JSON configuration file.
  #[error("failed to parse {}: {source}", path.display())]
  Json {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    #[source]
    source: serde_json::Error,
  },

  /// Failed to parse a YAML configuration file.
  #[error("failed to parse {}: {source}", path.display())]
  Yaml {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    #[source]
    source: serde_yaml::Error,
  },

  /// Failed to read a configuration input from disk.
  #[error("failed to read {}: {source}", path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    #[source]
    source: std::io::Error,
  },
}

/// Failure reported by a single transform executor or minimizer.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StepError {
  /// Description of what went wrong.
  pub message: String,
}

impl StepError {
  /// Build an error from any displayable message.
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// Errors that abort a build. Nothing is emitted when one is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// Configuration or invocation parameters are invalid.
  #[error(transparent)]
  Config(#[from] ConfigError),

  /// A chain step failed on a specific file.
  #[error("transform `{step}` failed on {path}: {source}")]
  Transform {
    /// Path of the file being transformed.
    path: String,
    /// Name of the failing step.
    step: String,
    /// Executor error.
    #[source]
    source: StepError,
  },

  /// A minimizer failed on an emitted artifact.
  #[error("minimizer `{minimizer}` failed on {path}: {source}")]
  Minimize {
    /// Artifact path.
    path: String,
    /// Minimizer name.
    minimizer: String,
    /// Minimizer error.
    #[source]
    source: StepError,
  },

  /// Two distinct contents resolved to the same output path.
  #[error("output path `{path}` produced by both `{first}` and `{second}` with different content")]
  NamingCollision {
    /// Colliding output path.
    path: String,
    /// Logical source of the first artifact.
    first: String,
    /// Logical source of the second artifact.
    second: String,
  },

  /// The asset manifest could not be serialised.
  #[error("failed to serialize the asset manifest: {0}")]
  Manifest(#[source] serde_json::Error),
}
