//! Step templates and mode/theme aware option resolution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::BuildContext;
use crate::mode::{BuildMode, ModeCondition};

/// Option key holding a `{"development": .., "production": ..}` branch.
pub const MODE_BRANCH_KEY: &str = "$mode";

/// Option string replaced by the configured theme overrides.
pub const THEME_REFERENCE: &str = "$theme";

/// Template of one transform step as declared by a rule.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformStepTemplate {
  /// Name of the external transform, resolved through the registry.
  pub name: String,
  /// Option bag handed to the transform after resolution.
  #[serde(default, skip_serializing_if = "Value::is_null")]
  pub options: Value,
  /// Modes in which the step runs.
  #[serde(default)]
  pub enabled_when: ModeCondition,
}

impl TransformStepTemplate {
  /// Step without options that runs in every mode.
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      options: Value::Null,
      enabled_when: ModeCondition::Always,
    }
  }

  /// Attach an option bag.
  pub fn with_options(mut self, options: Value) -> Self {
    self.options = options;
    self
  }

  /// Restrict the step to the modes accepted by `condition`.
  pub fn when(mut self, condition: ModeCondition) -> Self {
    self.enabled_when = condition;
    self
  }

  /// Resolve the template for `ctx`, or `None` when the step is disabled in this mode.
  pub fn resolve(&self, ctx: &BuildContext<'_>) -> Option<TransformStep> {
    if !self.enabled_when.allows(ctx.mode) {
      return None;
    }

    Some(TransformStep {
      name: self.name.clone(),
      options: resolve_options(&self.options, ctx).unwrap_or(Value::Null),
    })
  }
}

/// A step with its options fully resolved for one build mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformStep {
  /// Name of the external transform.
  pub name: String,
  /// Resolved option bag.
  #[serde(skip_serializing_if = "Value::is_null")]
  pub options: Value,
}

impl TransformStep {
  /// Built-in step that takes no options.
  pub fn builtin(name: &str) -> Self {
    Self {
      name: name.to_string(),
      options: Value::Null,
    }
  }
}

/// Resolve mode branches and theme references inside an option value.
///
/// A branch without a value for the current mode resolves to nothing: object members are
/// removed and array elements are dropped, so `plugins: [{"$mode": {"development": x}}]`
/// becomes an empty list in production.
pub fn resolve_options(value: &Value, ctx: &BuildContext<'_>) -> Option<Value> {
  match value {
    Value::String(text) if text == THEME_REFERENCE => Some(theme_value(ctx)),
    Value::Array(items) => Some(Value::Array(
      items
        .iter()
        .filter_map(|item| resolve_options(item, ctx))
        .collect(),
    )),
    Value::Object(map) => {
      if let Some(branches) = mode_branches(map) {
        return branches
          .get(ctx.mode.as_str())
          .and_then(|branch| resolve_options(branch, ctx));
      }

      let resolved: Map<String, Value> = map
        .iter()
        .filter_map(|(key, item)| resolve_options(item, ctx).map(|value| (key.clone(), value)))
        .collect();
      Some(Value::Object(resolved))
    }
    Value::Null => None,
    other => Some(other.clone()),
  }
}

fn mode_branches(map: &Map<String, Value>) -> Option<&Map<String, Value>> {
  if map.len() != 1 {
    return None;
  }
  map.get(MODE_BRANCH_KEY).and_then(Value::as_object)
}

fn theme_value(ctx: &BuildContext<'_>) -> Value {
  Value::Object(
    ctx
      .theme_overrides()
      .iter()
      .map(|(key, value)| (key.clone(), Value::String(value.clone())))
      .collect(),
  )
}

/// Shorthand for a `$mode` branch used by the built-in rule table.
pub fn by_mode(development: Option<Value>, production: Option<Value>) -> Value {
  let mut branches = Map::new();
  if let Some(value) = development {
    branches.insert(BuildMode::Development.as_str().to_string(), value);
  }
  if let Some(value) = production {
    branches.insert(BuildMode::Production.as_str().to_string(), value);
  }

  let mut wrapper = Map::new();
  wrapper.insert(MODE_BRANCH_KEY.to_string(), Value::Object(branches));
  Value::Object(wrapper)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PipelineConfig;
  use serde_json::json;

  #[test]
  fn disabled_steps_resolve_to_none() {
    let config = PipelineConfig::default();
    let step = TransformStepTemplate::new("style-loader").when(ModeCondition::Development);

    assert!(step.resolve(&BuildContext::new(&config, BuildMode::Development)).is_some());
    assert!(step.resolve(&BuildContext::new(&config, BuildMode::Production)).is_none());
  }

  #[test]
  fn mode_branches_pick_the_current_mode() {
    let config = PipelineConfig::default();
    let options = json!({
      "cacheDirectory": true,
      "plugins": [by_mode(Some(json!("react-refresh/babel")), None), "import"],
    });

    let dev = resolve_options(&options, &BuildContext::new(&config, BuildMode::Development));
    let prod = resolve_options(&options, &BuildContext::new(&config, BuildMode::Production));

    assert_eq!(
      dev,
      Some(json!({"cacheDirectory": true, "plugins": ["react-refresh/babel", "import"]}))
    );
    assert_eq!(prod, Some(json!({"cacheDirectory": true, "plugins": ["import"]})));
  }

  #[test]
  fn theme_references_merge_overrides_verbatim() {
    let mut config = PipelineConfig::default();
    config
      .theme_overrides
      .insert("@link-color".into(), "#1890ff".into());
    let ctx = BuildContext::new(&config, BuildMode::Production);

    let resolved = resolve_options(
      &json!({"lessOptions": {"modifyVars": "$theme", "javascriptEnabled": true}}),
      &ctx,
    );

    assert_eq!(
      resolved,
      Some(json!({
        "lessOptions": {
          "modifyVars": {"@link-color": "#1890ff", "@primary-color": "#1DA57A"},
          "javascriptEnabled": true
        }
      }))
    );
  }

  #[test]
  fn objects_with_extra_keys_are_not_branches() {
    let config = PipelineConfig::default();
    let ctx = BuildContext::new(&config, BuildMode::Production);
    let value = json!({"$mode": {"production": 1}, "other": 2});
    assert_eq!(resolve_options(&value, &ctx), Some(value.clone()));
  }
}
