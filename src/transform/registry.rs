//! Contracts for external transform executors and minimizers, and the name registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StepError;
use crate::mode::BuildMode;
use crate::transform::builtins;

/// Format of the content flowing between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
  /// JavaScript module source.
  Script,
  /// Stylesheet source.
  Style,
  /// Opaque binary data.
  Binary,
  /// Other textual data.
  Text,
}

/// Input handed to a [`TransformExecutor`].
#[derive(Debug, Clone, Copy)]
pub struct TransformInput<'a> {
  /// Project relative path of the file.
  pub path: &'a str,
  /// Output of the previous step, or the file content for the first step.
  pub content: &'a [u8],
  /// Format of `content`.
  pub format: ContentFormat,
  /// Resolved step options.
  pub options: &'a Value,
  /// Mode of the current build.
  pub mode: BuildMode,
}

/// Output produced by a [`TransformExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
  /// Transformed content.
  pub content: Vec<u8>,
  /// Format of the transformed content.
  pub format: ContentFormat,
  /// Non-fatal findings such as lint results.
  pub warnings: Vec<String>,
}

impl TransformOutput {
  /// Output without warnings.
  pub fn new(content: Vec<u8>, format: ContentFormat) -> Self {
    Self {
      content,
      format,
      warnings: Vec::new(),
    }
  }
}

/// External per-file transform (compiler, loader, linter).
pub trait TransformExecutor: Send + Sync {
  /// Apply the transform to one file.
  fn apply(&self, input: TransformInput<'_>) -> Result<TransformOutput, StepError>;
}

/// Input handed to a [`Minimizer`].
#[derive(Debug, Clone, Copy)]
pub struct MinimizeInput<'a> {
  /// Logical path of the artifact being minimized.
  pub path: &'a str,
  /// Artifact content.
  pub content: &'a [u8],
  /// Optimizer specific directives, passed through verbatim.
  pub options: &'a Value,
}

/// External whole-artifact optimizer.
pub trait Minimizer: Send + Sync {
  /// Minimize one artifact.
  fn minimize(&self, input: MinimizeInput<'_>) -> Result<Vec<u8>, StepError>;
}

/// Name based lookup of executors and minimizers.
#[derive(Clone, Default)]
pub struct TransformRegistry {
  executors: BTreeMap<String, Arc<dyn TransformExecutor>>,
  minimizers: BTreeMap<String, Arc<dyn Minimizer>>,
}

impl TransformRegistry {
  /// Registry without any entries.
  pub fn empty() -> Self {
    Self::default()
  }

  /// Registry populated with the built-in stand-ins for every transform and minimizer
  /// named by the default rule table.
  pub fn with_builtins() -> Self {
    let mut registry = Self::default();
    builtins::register(&mut registry);
    registry
  }

  /// Register or replace an executor.
  pub fn register_executor(
    &mut self,
    name: impl Into<String>,
    executor: impl TransformExecutor + 'static,
  ) -> &mut Self {
    self.executors.insert(name.into(), Arc::new(executor));
    self
  }

  /// Register or replace a minimizer.
  pub fn register_minimizer(
    &mut self,
    name: impl Into<String>,
    minimizer: impl Minimizer + 'static,
  ) -> &mut Self {
    self.minimizers.insert(name.into(), Arc::new(minimizer));
    self
  }

  /// Look up an executor.
  pub fn executor(&self, name: &str) -> Option<&Arc<dyn TransformExecutor>> {
    self.executors.get(name)
  }

  /// Look up a minimizer.
  pub fn minimizer(&self, name: &str) -> Option<&Arc<dyn Minimizer>> {
    self.minimizers.get(name)
  }

  /// Returns `true` when an executor is registered under `name`.
  pub fn has_executor(&self, name: &str) -> bool {
    self.executors.contains_key(name)
  }

  /// Returns `true` when a minimizer is registered under `name`.
  pub fn has_minimizer(&self, name: &str) -> bool {
    self.minimizers.contains_key(name)
  }
}

impl fmt::Debug for TransformRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TransformRegistry")
      .field("executors", &self.executors.keys().collect::<Vec<_>>())
      .field("minimizers", &self.minimizers.keys().collect::<Vec<_>>())
      .finish()
  }
}
