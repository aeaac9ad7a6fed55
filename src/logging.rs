//! Logging setup for the command line tool.
//!
//! The library only emits `tracing` events; embedders install their own subscriber.

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
  EnvFilter, fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

static INIT: Once = Once::new();

/// Verbosity of the command line output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
  /// No output.
  Silent,
  /// Errors only.
  Error,
  /// Errors and warnings.
  Warn,
  /// Phase summaries.
  #[default]
  Info,
  /// Per-file decisions.
  Debug,
}

impl LogLevel {
  fn as_level_filter(self) -> LevelFilter {
    match self {
      Self::Silent => LevelFilter::OFF,
      Self::Error => LevelFilter::ERROR,
      Self::Warn => LevelFilter::WARN,
      Self::Info => LevelFilter::INFO,
      Self::Debug => LevelFilter::DEBUG,
    }
  }
}

impl FromStr for LogLevel {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.to_lowercase().as_str() {
      "silent" | "off" => Ok(Self::Silent),
      "error" => Ok(Self::Error),
      "warn" | "warning" => Ok(Self::Warn),
      "info" => Ok(Self::Info),
      "debug" => Ok(Self::Debug),
      other => Err(format!("invalid log level: {other}")),
    }
  }
}

impl fmt::Display for LogLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_level_filter())
  }
}

/// Install the global subscriber. `RUST_LOG` directives take precedence over `level`.
///
/// Only the first call has an effect.
pub fn init_logging(level: LogLevel) {
  INIT.call_once(|| {
    let filter = EnvFilter::builder()
      .with_default_directive(level.as_level_filter().into())
      .from_env_lossy();

    tracing_subscriber::registry()
      .with(filter)
      .with(
        layer_fmt::layer()
          .compact()
          .with_target(false)
          .without_time()
          .with_writer(std::io::stderr),
      )
      .init();
  });
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_levels() {
    assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
    assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::Silent);
    assert!("loud".parse::<LogLevel>().is_err());
  }

  #[test]
  fn displays_filter_names() {
    assert_eq!(LogLevel::Debug.to_string(), "debug");
    assert_eq!(LogLevel::Silent.to_string(), "off");
    assert_eq!(LogLevel::default(), LogLevel::Info);
  }
}
