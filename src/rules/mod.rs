//! Rule table: declarations, compiled patterns and the path matcher.
//!
//! Rules are tagged with an explicit group instead of relying on list position alone,
//! so adding a rule to one group can never shadow a rule in another.

mod defaults;
mod matcher;
mod pattern;
mod table;

pub use defaults::{ASSET_GROUP, IMAGE_OUTPUT_TEMPLATE, default_rules};
pub use matcher::{RuleMatch, RuleMatcher};
pub use pattern::{PatternConfig, RulePattern};
pub use table::{AssetRule, DEFAULT_GROUP, RuleConfig, RuleKind, RuleTable, UnusedExclusion};
