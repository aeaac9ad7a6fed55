//! Built-in rule table for a React/antd style front-end project.

use serde_json::json;

use crate::mode::ModeCondition;
use crate::rules::pattern::PatternConfig;
use crate::rules::table::{RuleConfig, RuleKind};
use crate::transform::{THEME_REFERENCE, TransformStepTemplate, by_mode};

/// Group shared by the mutually exclusive file categories.
pub const ASSET_GROUP: &str = "assets";

/// Template used for emitted images.
pub const IMAGE_OUTPUT_TEMPLATE: &str = "static/imgs/[hash][ext][query]";

/// The default ordered rule table.
///
/// An auxiliary lint rule comes first so it sees the original source; every other rule
/// belongs to one exclusive group, so each file lands in exactly one category.
pub fn default_rules() -> Vec<RuleConfig> {
  vec![
    RuleConfig {
      name: "lint".into(),
      pattern: PatternConfig::extensions(&["js", "jsx", "ts", "tsx"])
        .including("src")
        .excluding("(^|/)node_modules/"),
      group: None,
      exclusive: false,
      kind: RuleKind::Transform,
      chain: vec![TransformStepTemplate::new("eslint")],
      output: None,
    },
    style_rule("css", r"\.css$", None),
    style_rule(
      "less",
      r"\.less$",
      Some(TransformStepTemplate::new("less-loader").with_options(json!({
        "lessOptions": {
          "modifyVars": THEME_REFERENCE,
          "javascriptEnabled": true
        }
      }))),
    ),
    style_rule(
      "sass",
      r"\.s[ac]ss$",
      Some(TransformStepTemplate::new("sass-loader")),
    ),
    style_rule(
      "stylus",
      r"\.styl$",
      Some(TransformStepTemplate::new("stylus-loader")),
    ),
    exclusive(
      "images",
      PatternConfig::test(r"\.(png|jpe?g|gif|svg|ico)$"),
      RuleKind::Asset { inline_below: None },
      Vec::new(),
      Some(IMAGE_OUTPUT_TEMPLATE.into()),
    ),
    exclusive(
      "media",
      PatternConfig::test(r"\.(ttf|woff2?|map3|map4|avi)$"),
      RuleKind::Resource,
      Vec::new(),
      None,
    ),
    exclusive(
      "scripts",
      PatternConfig::test(r"\.(jsx|js)$").including("src"),
      RuleKind::Transform,
      vec![TransformStepTemplate::new("babel-loader").with_options(json!({
        "cacheDirectory": true,
        "cacheCompression": false,
        "plugins": [by_mode(Some(json!("react-refresh/babel")), None)]
      }))],
      None,
    ),
    exclusive(
      "scripts-antd",
      PatternConfig::test(r"\.(jsx?|tsx?)$").excluding("(^|/)node_modules/"),
      RuleKind::Transform,
      vec![TransformStepTemplate::new("babel-loader").with_options(json!({
        "plugins": [["import", {"libraryName": "antd", "style": "css"}]]
      }))],
      None,
    ),
    exclusive(
      "typescript",
      PatternConfig::test(r"\.tsx?$").excluding("(^|/)node_modules/"),
      RuleKind::Transform,
      vec![TransformStepTemplate::new("ts-loader")],
      None,
    ),
  ]
}

/// Style chains run the preprocessor first and end by injecting (development) or
/// extracting (production) the stylesheet.
fn style_rule(name: &str, test: &str, preprocessor: Option<TransformStepTemplate>) -> RuleConfig {
  let mut chain: Vec<TransformStepTemplate> = preprocessor.into_iter().collect();
  chain.extend([
    TransformStepTemplate::new("postcss-loader").with_options(json!({
      "postcssOptions": {"plugins": ["postcss-preset-env"]}
    })),
    TransformStepTemplate::new("css-loader"),
    TransformStepTemplate::new("style-loader").when(ModeCondition::Development),
    TransformStepTemplate::new("mini-css-extract").when(ModeCondition::Production),
  ]);

  exclusive(
    name,
    PatternConfig::test(test),
    RuleKind::Transform,
    chain,
    None,
  )
}

fn exclusive(
  name: &str,
  pattern: PatternConfig,
  kind: RuleKind,
  chain: Vec<TransformStepTemplate>,
  output: Option<String>,
) -> RuleConfig {
  RuleConfig {
    name: name.into(),
    pattern,
    group: Some(ASSET_GROUP.into()),
    exclusive: true,
    kind,
    chain,
    output,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lint_rule_excludes_the_dependency_directory() {
    let rules = default_rules();
    let lint = rules.iter().find(|rule| rule.name == "lint").unwrap();
    assert_eq!(lint.pattern.exclude, vec!["(^|/)node_modules/".to_string()]);
    assert!(!lint.exclusive);
  }

  #[test]
  fn every_other_rule_is_in_the_asset_group() {
    for rule in default_rules().iter().filter(|rule| rule.name != "lint") {
      assert!(rule.exclusive, "{} should be exclusive", rule.name);
      assert_eq!(rule.group.as_deref(), Some(ASSET_GROUP));
    }
  }

  #[test]
  fn default_rules_round_trip_through_json() {
    let rules = default_rules();
    let json = serde_json::to_string(&rules).unwrap();
    let parsed: Vec<RuleConfig> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, rules);
  }
}
