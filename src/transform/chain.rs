//! Builds the ordered transform chain for one file from its rule match.

use serde::Serialize;

use crate::config::BuildContext;
use crate::rules::{RuleKind, RuleMatch};
use crate::transform::builtins::{INLINE_STEP, RESOURCE_STEP};
use crate::transform::step::TransformStep;

/// How the output of a chain is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetStrategy {
  /// The chain output becomes a script or style module.
  Transform,
  /// The file is embedded as a data URI module.
  InlineDataUri,
  /// The file is emitted as a separate media artifact.
  EmitFile,
  /// No rule matched; the file is copied unmodified.
  Passthrough,
}

/// Facts about a file that influence its chain.
#[derive(Debug, Clone, Copy)]
pub struct FileMeta<'a> {
  /// Project relative path.
  pub path: &'a str,
  /// Size in bytes.
  pub size: u64,
}

/// Resolved, immutable chain for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformChain {
  /// Names of the rules that contributed steps, in table order.
  pub rules: Vec<String>,
  /// Steps executed left to right.
  pub steps: Vec<TransformStep>,
  /// Delivery strategy.
  pub strategy: AssetStrategy,
  /// Filename template override from the primary rule.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<String>,
}

impl TransformChain {
  /// Chain for a file no rule matched.
  pub fn passthrough() -> Self {
    Self {
      rules: Vec::new(),
      steps: Vec::new(),
      strategy: AssetStrategy::Passthrough,
      output: None,
    }
  }

  /// Step names in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|step| step.name.as_str()).collect()
  }

  /// Stable fingerprint of the chain, used in transform cache keys.
  pub fn fingerprint(&self) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(format!("{:?}", self.strategy).as_bytes());
    for step in &self.steps {
      hasher.update(b"\0");
      hasher.update(step.name.as_bytes());
      hasher.update(b"\0");
      hasher.update(step.options.to_string().as_bytes());
    }
    hasher.finalize()
  }
}

/// Turns rule matches into transform chains for one build mode.
#[derive(Debug, Clone, Copy)]
pub struct TransformChainBuilder<'a> {
  ctx: BuildContext<'a>,
}

impl<'a> TransformChainBuilder<'a> {
  /// Create a builder bound to the build context.
  pub fn new(ctx: BuildContext<'a>) -> Self {
    Self { ctx }
  }

  /// Build the chain for `meta` from the rules that matched it.
  ///
  /// Steps are concatenated in table order with disabled steps dropped; nothing is
  /// reordered or deduplicated. The primary rule decides the asset strategy.
  pub fn build(&self, matched: &RuleMatch<'_>, meta: &FileMeta<'_>) -> TransformChain {
    if matched.is_passthrough() {
      return TransformChain::passthrough();
    }

    let mut steps: Vec<TransformStep> = matched
      .rules()
      .iter()
      .flat_map(|rule| rule.chain.iter())
      .filter_map(|template| template.resolve(&self.ctx))
      .collect();

    let primary = matched.primary();
    let strategy = match primary.map(|rule| &rule.kind) {
      None | Some(RuleKind::Transform) => AssetStrategy::Transform,
      Some(RuleKind::Inline) => AssetStrategy::InlineDataUri,
      Some(RuleKind::Resource) => AssetStrategy::EmitFile,
      Some(RuleKind::Asset { inline_below }) => {
        let threshold = inline_below.unwrap_or(self.ctx.config.inline_threshold);
        if meta.size < threshold {
          AssetStrategy::InlineDataUri
        } else {
          AssetStrategy::EmitFile
        }
      }
    };

    match strategy {
      AssetStrategy::InlineDataUri => steps.push(TransformStep::builtin(INLINE_STEP)),
      AssetStrategy::EmitFile => steps.push(TransformStep::builtin(RESOURCE_STEP)),
      AssetStrategy::Transform | AssetStrategy::Passthrough => {}
    }

    TransformChain {
      rules: matched.rules().iter().map(|rule| rule.name.clone()).collect(),
      steps,
      strategy,
      output: primary.and_then(|rule| rule.output.clone()),
    }
  }
}
