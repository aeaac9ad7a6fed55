//! Classifies a path against the rule table.

use std::collections::BTreeSet;

use crate::rules::table::{AssetRule, RuleTable};

/// Rules that matched one path, in table order.
#[derive(Debug, Clone, Default)]
pub struct RuleMatch<'t> {
  rules: Vec<&'t AssetRule>,
}

impl<'t> RuleMatch<'t> {
  /// Contributing rules in table order.
  pub fn rules(&self) -> &[&'t AssetRule] {
    &self.rules
  }

  /// First exclusive rule that matched; it decides how the file is delivered.
  pub fn primary(&self) -> Option<&'t AssetRule> {
    self.rules.iter().copied().find(|rule| rule.exclusive)
  }

  /// Returns `true` when no rule matched.
  pub fn is_passthrough(&self) -> bool {
    self.rules.is_empty()
  }
}

/// Walks the rule table for each path.
///
/// Inside an exclusive group the first matching rule wins and later rules of the same
/// group are skipped. Auxiliary rules (not exclusive) contribute whenever they match.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatcher<'t> {
  table: &'t RuleTable,
}

impl<'t> RuleMatcher<'t> {
  /// Create a matcher over a compiled table.
  pub fn new(table: &'t RuleTable) -> Self {
    Self { table }
  }

  /// Match `path` (project relative, forward slashes).
  pub fn match_path(&self, path: &str) -> RuleMatch<'t> {
    let mut claimed: BTreeSet<&str> = BTreeSet::new();
    let mut rules = Vec::new();

    for rule in self.table.rules() {
      match rule.exclusive_group() {
        Some(group) => {
          if claimed.contains(group) || !rule.pattern.matches(path) {
            continue;
          }
          claimed.insert(group);
          rules.push(rule);
        }
        None => {
          if rule.pattern.matches(path) {
            rules.push(rule);
          }
        }
      }
    }

    RuleMatch { rules }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rules::{PatternConfig, RuleConfig, RuleKind, default_rules};
  use crate::transform::{TransformRegistry, TransformStepTemplate};
  use proptest::prelude::*;

  fn default_table() -> RuleTable {
    RuleTable::compile(&default_rules(), &TransformRegistry::with_builtins()).unwrap()
  }

  fn names(matched: &RuleMatch<'_>) -> Vec<String> {
    matched.rules().iter().map(|rule| rule.name.clone()).collect()
  }

  #[test]
  fn first_match_wins_inside_group() {
    let table = default_table();
    let matcher = RuleMatcher::new(&table);

    assert_eq!(names(&matcher.match_path("src/app.jsx")), vec!["lint", "scripts"]);
    assert_eq!(
      names(&matcher.match_path("lib/app.tsx")),
      vec!["scripts-antd"]
    );
    assert_eq!(names(&matcher.match_path("src/app.tsx")), vec![
      "lint",
      "scripts-antd"
    ]);
  }

  #[test]
  fn vendor_scripts_skip_lint_and_exclusions() {
    let table = default_table();
    let matcher = RuleMatcher::new(&table);
    assert!(matcher.match_path("node_modules/antd/index.ts").is_passthrough());
  }

  #[test]
  fn at_most_one_exclusive_rule_per_group() {
    let table = default_table();
    let matcher = RuleMatcher::new(&table);
    let samples = [
      "src/a.css",
      "src/a.less",
      "src/a.scss",
      "src/a.sass",
      "src/a.styl",
      "src/a.png",
      "src/a.jpeg",
      "src/a.svg",
      "src/a.woff2",
      "src/a.js",
      "src/a.ts",
      "lib/a.js",
      "README.md",
    ];

    for sample in samples {
      let matched = matcher.match_path(sample);
      let exclusive = matched.rules().iter().filter(|rule| rule.exclusive).count();
      assert!(exclusive <= 1, "{sample} matched {exclusive} exclusive rules");
    }
  }

  #[test]
  fn auxiliary_rules_accumulate_in_table_order() {
    let step = |name: &str| TransformStepTemplate::new(name);
    let configs = vec![
      RuleConfig {
        name: "compile".into(),
        pattern: PatternConfig::extensions(&["js"]),
        group: Some("scripts".into()),
        exclusive: true,
        kind: RuleKind::Transform,
        chain: vec![step("babel-loader")],
        output: None,
      },
      RuleConfig {
        name: "compile-again".into(),
        pattern: PatternConfig::extensions(&["js"]),
        group: Some("scripts".into()),
        exclusive: true,
        kind: RuleKind::Transform,
        chain: vec![step("ts-loader")],
        output: None,
      },
      RuleConfig {
        name: "lint".into(),
        pattern: PatternConfig::extensions(&["js"]),
        group: None,
        exclusive: false,
        kind: RuleKind::Transform,
        chain: vec![step("eslint")],
        output: None,
      },
    ];
    let table = RuleTable::compile(&configs, &TransformRegistry::with_builtins()).unwrap();
    let matched = RuleMatcher::new(&table).match_path("a.js");

    assert_eq!(names(&matched), vec!["compile", "lint"]);
    assert_eq!(matched.primary().map(|rule| rule.name.as_str()), Some("compile"));
  }

  #[test]
  fn unmatched_paths_have_no_primary() {
    let table = default_table();
    let matched = RuleMatcher::new(&table).match_path("public/favicon.txt");
    assert!(matched.is_passthrough());
    assert!(matched.primary().is_none());
  }

  proptest! {
    #[test]
    fn exclusive_groups_match_at_most_once(
      dir in "(src|lib|node_modules/pkg|src/components)",
      stem in "[a-z]{1,8}",
      ext in "(js|jsx|ts|tsx|css|less|scss|sass|styl|png|jpg|svg|woff2|ttf|json|txt)",
    ) {
      let table = default_table();
      let path = format!("{dir}/{stem}.{ext}");
      let matched = RuleMatcher::new(&table).match_path(&path);

      let mut groups = BTreeSet::new();
      for rule in matched.rules() {
        if let Some(group) = rule.exclusive_group() {
          prop_assert!(groups.insert(group), "{path} matched {group} twice");
        }
      }
      prop_assert_eq!(
        names(&matched),
        names(&RuleMatcher::new(&table).match_path(&path))
      );
    }
  }
}
