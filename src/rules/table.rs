//! Rule declarations and the compiled, immutable rule table.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::output::validate_template;
use crate::rules::pattern::{PatternConfig, RulePattern};
use crate::transform::{TransformRegistry, TransformStepTemplate};

/// Group used by exclusive rules that do not name one.
pub const DEFAULT_GROUP: &str = "default";

/// How a matched file is delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleKind {
  /// Run the declared chain and bundle the result.
  #[default]
  Transform,
  /// Inline below a size threshold, emit a separate file otherwise.
  #[serde(rename_all = "camelCase")]
  Asset {
    /// Threshold in bytes; falls back to the global `inlineThreshold`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_below: Option<u64>,
  },
  /// Always emit a separate file.
  Resource,
  /// Always inline as a data URI.
  Inline,
}

/// Rule as written in the configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
  /// Unique rule name.
  pub name: String,
  /// Paths the rule applies to.
  pub pattern: PatternConfig,
  /// Group the rule belongs to.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub group: Option<String>,
  /// First match wins inside the group.
  #[serde(default)]
  pub exclusive: bool,
  /// Delivery kind.
  #[serde(default)]
  pub kind: RuleKind,
  /// Ordered step templates.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub chain: Vec<TransformStepTemplate>,
  /// Filename template override for emitted files.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<String>,
}

/// Compiled rule.
#[derive(Debug, Clone)]
pub struct AssetRule {
  /// Unique rule name.
  pub name: String,
  /// Compiled pattern.
  pub pattern: RulePattern,
  /// Group the rule belongs to.
  pub group: Option<String>,
  /// First match wins inside the group.
  pub exclusive: bool,
  /// Delivery kind.
  pub kind: RuleKind,
  /// Ordered step templates.
  pub chain: Vec<TransformStepTemplate>,
  /// Filename template override for emitted files.
  pub output: Option<String>,
}

impl AssetRule {
  /// Exclusive group of the rule; `None` for auxiliary rules.
  pub fn exclusive_group(&self) -> Option<&str> {
    self
      .exclusive
      .then(|| self.group.as_deref().unwrap_or(DEFAULT_GROUP))
  }
}

/// Unused exclusion pattern found while validating the table against a file set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedExclusion {
  /// Rule owning the pattern.
  pub rule: String,
  /// Pattern text.
  pub pattern: String,
}

/// Ordered, immutable table of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
  rules: Vec<AssetRule>,
}

impl RuleTable {
  /// Compile the declared rules, resolving every step name against `registry`.
  ///
  /// Fails on duplicate names, malformed patterns, unknown transforms and malformed
  /// output templates, before any file is looked at.
  pub fn compile(configs: &[RuleConfig], registry: &TransformRegistry) -> ConfigResult<Self> {
    let mut names = BTreeSet::new();
    let mut rules = Vec::with_capacity(configs.len());

    for config in configs {
      if !names.insert(config.name.as_str()) {
        return Err(ConfigError::DuplicateRule(config.name.clone()));
      }

      let pattern = RulePattern::compile(&config.name, &config.pattern)?;

      if let Some(step) = config
        .chain
        .iter()
        .find(|step| !registry.has_executor(&step.name))
      {
        return Err(ConfigError::UnknownTransform {
          rule: config.name.clone(),
          step: step.name.clone(),
        });
      }

      if let Some(template) = &config.output {
        validate_template(template)?;
      }

      rules.push(AssetRule {
        name: config.name.clone(),
        pattern,
        group: config.group.clone(),
        exclusive: config.exclusive,
        kind: config.kind.clone(),
        chain: config.chain.clone(),
        output: config.output.clone(),
      });
    }

    debug!(rules = rules.len(), "compiled rule table");
    Ok(Self { rules })
  }

  /// Rules in declaration order.
  pub fn rules(&self) -> &[AssetRule] {
    &self.rules
  }

  /// Look up a rule by name.
  pub fn get(&self, name: &str) -> Option<&AssetRule> {
    self.rules.iter().find(|rule| rule.name == name)
  }

  /// Exclusion patterns that rejected none of `paths`.
  ///
  /// A pattern that never fires usually names the wrong directory, for example
  /// `node_module` instead of `node_modules`.
  pub fn unused_exclusions<'p>(
    &self,
    paths: impl IntoIterator<Item = &'p str> + Clone,
  ) -> Vec<UnusedExclusion> {
    let mut unused = Vec::new();
    for rule in &self.rules {
      for exclusion in rule.pattern.exclusions() {
        if !paths.clone().into_iter().any(|path| exclusion.is_match(path)) {
          unused.push(UnusedExclusion {
            rule: rule.name.clone(),
            pattern: exclusion.as_str().to_string(),
          });
        }
      }
    }
    unused
  }
}
