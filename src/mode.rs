//! Build mode and the mode predicates attached to steps and plan fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Process-wide build mode, fixed for the duration of one build invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
  /// Fast rebuilds, stable filenames, no minimization.
  #[default]
  Development,
  /// Content hashed filenames, minimization and chunk splitting.
  Production,
}

impl BuildMode {
  /// Returns `true` for [`BuildMode::Production`].
  pub fn is_production(self) -> bool {
    matches!(self, Self::Production)
  }

  /// Lowercase identifier used in configuration and cache keys.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Development => "development",
      Self::Production => "production",
    }
  }
}

impl fmt::Display for BuildMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BuildMode {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_lowercase().as_str() {
      "development" | "dev" => Ok(Self::Development),
      "production" | "prod" => Ok(Self::Production),
      other => Err(format!("unknown build mode: {other}")),
    }
  }
}

/// Predicate over [`BuildMode`] deciding whether a step or plan field is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeCondition {
  /// Active in every mode.
  #[default]
  Always,
  /// Active only in development builds.
  Development,
  /// Active only in production builds.
  Production,
}

impl ModeCondition {
  /// Evaluate the predicate for `mode`.
  pub fn allows(self, mode: BuildMode) -> bool {
    match self {
      Self::Always => true,
      Self::Development => mode == BuildMode::Development,
      Self::Production => mode == BuildMode::Production,
    }
  }
}
