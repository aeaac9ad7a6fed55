//! Path patterns attached to rules: regex tests, extension lists, globs and scopes.

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::paths::{scope_matches, split_query};

/// Declarative pattern as written in the configuration document.
///
/// Every populated condition must hold for a path to match. `include` entries are
/// directory scopes, `exclude` entries are regular expressions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatternConfig {
  /// Regular expression tested against the path.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub test: Option<String>,
  /// File extensions without the leading dot, matched case-insensitively.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub extensions: Vec<String>,
  /// Glob over the project relative path (`*`, `**`, `?` and `{a,b}`).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub glob: Option<String>,
  /// Directory scopes the path must live in.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub include: Vec<String>,
  /// Regular expressions that reject a path.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub exclude: Vec<String>,
}

impl PatternConfig {
  /// Pattern testing a regular expression.
  pub fn test(pattern: &str) -> Self {
    Self {
      test: Some(pattern.to_string()),
      ..Self::default()
    }
  }

  /// Pattern matching a list of extensions.
  pub fn extensions(extensions: &[&str]) -> Self {
    Self {
      extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
      ..Self::default()
    }
  }

  /// Restrict the pattern to a directory scope.
  pub fn including(mut self, scope: &str) -> Self {
    self.include.push(scope.to_string());
    self
  }

  /// Reject paths matching `pattern`.
  pub fn excluding(mut self, pattern: &str) -> Self {
    self.exclude.push(pattern.to_string());
    self
  }
}

/// Compiled form of a [`PatternConfig`].
#[derive(Debug, Clone)]
pub struct RulePattern {
  tests: Vec<Regex>,
  glob: Option<GlobMatcher>,
  include: Vec<String>,
  exclude: Vec<Regex>,
}

impl RulePattern {
  /// Compile the pattern for `rule`, failing on malformed regexes or globs.
  pub fn compile(rule: &str, config: &PatternConfig) -> ConfigResult<Self> {
    let mut tests = Vec::new();

    if let Some(test) = &config.test {
      tests.push(compile_regex(rule, test)?);
    }

    if !config.extensions.is_empty() {
      let alternatives = config
        .extensions
        .iter()
        .map(|ext| regex::escape(ext.trim().trim_start_matches('.')))
        .collect::<Vec<_>>()
        .join("|");
      tests.push(compile_regex(rule, &format!(r"(?i)\.(?:{alternatives})$"))?);
    }

    let glob = config
      .glob
      .as_deref()
      .map(|glob| compile_glob(rule, glob))
      .transpose()?;

    if tests.is_empty() && glob.is_none() {
      return Err(ConfigError::EmptyPattern(rule.to_string()));
    }

    let exclude = config
      .exclude
      .iter()
      .map(|pattern| compile_regex(rule, pattern))
      .collect::<ConfigResult<Vec<_>>>()?;

    Ok(Self {
      tests,
      glob,
      include: config.include.clone(),
      exclude,
    })
  }

  /// Returns `true` when `path` satisfies every condition of the pattern.
  pub fn matches(&self, path: &str) -> bool {
    let (path, _) = split_query(path);

    if !self.tests.iter().all(|test| test.is_match(path)) {
      return false;
    }

    if self.glob.as_ref().is_some_and(|glob| !glob.is_match(path)) {
      return false;
    }

    if !self.include.is_empty() && !self.include.iter().any(|scope| scope_matches(scope, path)) {
      return false;
    }

    !self.exclude.iter().any(|pattern| pattern.is_match(path))
  }

  /// Compiled exclusion patterns, in declaration order.
  pub fn exclusions(&self) -> &[Regex] {
    &self.exclude
  }
}

fn compile_regex(rule: &str, pattern: &str) -> ConfigResult<Regex> {
  Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
    rule: rule.to_string(),
    pattern: pattern.to_string(),
    source: Box::new(source),
  })
}

fn compile_glob(rule: &str, glob: &str) -> ConfigResult<GlobMatcher> {
  GlobBuilder::new(glob)
    .literal_separator(true)
    .build()
    .map(|glob| glob.compile_matcher())
    .map_err(|source| ConfigError::InvalidPattern {
      rule: rule.to_string(),
      pattern: glob.to_string(),
      source: Box::new(source),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extension_lists_are_case_insensitive() {
    let pattern = RulePattern::compile("images", &PatternConfig::extensions(&["png", ".jpg"]))
      .expect("pattern should compile");
    assert!(pattern.matches("src/logo.PNG"));
    assert!(pattern.matches("src/photo.jpg?size=small"));
    assert!(!pattern.matches("src/photo.jpgx"));
  }

  #[test]
  fn include_scopes_and_excludes_combine() {
    let config = PatternConfig::test(r"\.jsx?$")
      .including("src")
      .excluding("node_modules");
    let pattern = RulePattern::compile("scripts", &config).expect("pattern should compile");

    assert!(pattern.matches("src/app.jsx"));
    assert!(!pattern.matches("lib/app.js"));
    assert!(!pattern.matches("src/node_modules/dep/index.js"));
  }

  #[test]
  fn globs_match_whole_paths() {
    let config = PatternConfig {
      glob: Some("src/**/*.{ts,tsx}".into()),
      ..PatternConfig::default()
    };
    let pattern = RulePattern::compile("typescript", &config).expect("glob should compile");
    assert!(pattern.matches("src/app.ts"));
    assert!(pattern.matches("src/pages/home/index.tsx"));
    assert!(!pattern.matches("test/app.ts"));
    assert!(!pattern.matches("src/app.tsx.map"));
    assert!(!pattern.matches("lib/src/app.ts"));

    let shallow = PatternConfig {
      glob: Some("src/*.js".into()),
      ..PatternConfig::default()
    };
    let shallow = RulePattern::compile("shallow", &shallow).expect("glob should compile");
    assert!(shallow.matches("src/main.js"));
    assert!(!shallow.matches("src/pages/home.js"));
  }

  #[test]
  fn malformed_regex_names_the_rule() {
    let err = RulePattern::compile("broken", &PatternConfig::test(r"\.(css$")).unwrap_err();
    match err {
      ConfigError::InvalidPattern { rule, pattern, .. } => {
        assert_eq!(rule, "broken");
        assert_eq!(pattern, r"\.(css$");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn unbalanced_glob_braces_are_rejected() {
    let config = PatternConfig {
      glob: Some("src/*.{js,ts".into()),
      ..PatternConfig::default()
    };
    match RulePattern::compile("glob", &config) {
      Err(ConfigError::InvalidPattern { rule, pattern, .. }) => {
        assert_eq!(rule, "glob");
        assert_eq!(pattern, "src/*.{js,ts");
      }
      other => panic!("unexpected result: {other:?}"),
    }
  }

  #[test]
  fn empty_patterns_are_rejected() {
    assert!(matches!(
      RulePattern::compile("nothing", &PatternConfig::default()),
      Err(ConfigError::EmptyPattern(_))
    ));
  }
}
