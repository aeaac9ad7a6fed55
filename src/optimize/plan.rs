//! Mode dependent optimization policy.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{ConfigError, ConfigResult};
use crate::mode::{BuildMode, ModeCondition};

/// Placeholder replaced by the entry name in runtime chunk templates.
pub const ENTRY_NAME_PLACEHOLDER: &str = "[name]";

/// Registry names of the minimizers run by production builds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinimizerNames {
  /// Minimizer for script chunks.
  pub scripts: String,
  /// Minimizer for extracted stylesheets.
  pub styles: String,
  /// Minimizer for emitted images.
  pub images: String,
}

impl Default for MinimizerNames {
  fn default() -> Self {
    Self {
      scripts: "terser".into(),
      styles: "css-minimizer".into(),
      images: "image-minimizer".into(),
    }
  }
}

/// One image optimizer plugin and its options, serialised as `[name, options]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageDirective(pub String, pub Value);

/// The `optimization` section of the configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizationConfig {
  /// Minimizers run when the plan enables minification.
  pub minimizers: MinimizerNames,
  /// Name template of per-entry runtime chunks.
  pub runtime_chunk: String,
  /// Plugins handed verbatim to the image minimizer.
  pub image_directives: Vec<ImageDirective>,
}

impl Default for OptimizationConfig {
  fn default() -> Self {
    Self {
      minimizers: MinimizerNames::default(),
      runtime_chunk: "runtime~[name]".into(),
      image_directives: vec![
        ImageDirective("gifsicle".into(), json!({"interlaced": true})),
        ImageDirective("jpegtran".into(), json!({"progressive": true})),
        ImageDirective("optipng".into(), json!({"optimizationLevel": 5})),
        ImageDirective(
          "svgo".into(),
          json!({
            "plugins": [
              "preset-default",
              "prefixIds",
              {"name": "sortAttrs", "params": {"xmlnsOrder": "alphabetical"}}
            ]
          }),
        ),
      ],
    }
  }
}

/// How modules are distributed over chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitChunks {
  /// Vendor and shared modules move into their own chunks.
  All,
  /// Every entry chunk carries all of its modules.
  None,
}

/// Source map flavour requested from the external tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMapStyle {
  /// Separate `.map` files next to each script.
  Full,
  /// Module level maps without column data, produced by the dev server.
  CheapModule,
}

/// Names runtime chunks after their entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeChunkNamer {
  template: String,
}

impl RuntimeChunkNamer {
  /// Namer for `template`, which must contain `[name]`.
  pub fn new(template: &str) -> ConfigResult<Self> {
    if !template.contains(ENTRY_NAME_PLACEHOLDER) {
      return Err(ConfigError::InvalidTemplate {
        template: template.to_string(),
        reason: format!("runtime chunk names must contain {ENTRY_NAME_PLACEHOLDER}"),
      });
    }
    Ok(Self {
      template: template.to_string(),
    })
  }

  /// Runtime chunk name for `entry`.
  pub fn name(&self, entry: &str) -> String {
    self.template.replace(ENTRY_NAME_PLACEHOLDER, entry)
  }
}

/// Whole-build optimization decisions, computed once per build.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationPlan {
  /// Mode the plan was computed for.
  pub mode: BuildMode,
  /// Run the style minimizer.
  pub minimize_styles: bool,
  /// Run the script minimizer.
  pub minimize_scripts: bool,
  /// Run the image minimizer.
  pub minimize_images: bool,
  /// Chunk splitting policy.
  pub split_chunks: SplitChunks,
  /// Per-entry runtime chunk naming, when the runtime is extracted.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub runtime_chunk: Option<RuntimeChunkNamer>,
  /// Emit live reload hooks in the runtime bootstrap.
  pub live_reload: bool,
  /// Source map flavour.
  pub source_maps: SourceMapStyle,
  /// Image optimizer plugins, passed through verbatim.
  pub image_directives: Vec<ImageDirective>,
}

impl OptimizationPlan {
  /// Returns `true` when any minimizer runs.
  pub fn minimizes(&self) -> bool {
    self.minimize_scripts || self.minimize_styles || self.minimize_images
  }

  /// Image directives as the option bag handed to the image minimizer.
  pub fn image_options(&self) -> Value {
    Value::Array(
      self
        .image_directives
        .iter()
        .map(|ImageDirective(name, options)| json!([name, options]))
        .collect(),
    )
  }
}

/// Modes in which each optimization is enabled.
struct PlanPolicy {
  minimize: ModeCondition,
  split_all: ModeCondition,
  runtime_chunk: ModeCondition,
  live_reload: ModeCondition,
  full_source_maps: ModeCondition,
}

const POLICY: PlanPolicy = PlanPolicy {
  minimize: ModeCondition::Production,
  split_all: ModeCondition::Production,
  runtime_chunk: ModeCondition::Production,
  live_reload: ModeCondition::Development,
  full_source_maps: ModeCondition::Production,
};

/// Computes the optimization plan of a build.
#[derive(Debug, Clone)]
pub struct OptimizationPlanner {
  config: OptimizationConfig,
  runtime: RuntimeChunkNamer,
}

impl OptimizationPlanner {
  /// Create a planner, validating the runtime chunk template.
  pub fn new(config: &OptimizationConfig) -> ConfigResult<Self> {
    Ok(Self {
      runtime: RuntimeChunkNamer::new(&config.runtime_chunk)?,
      config: config.clone(),
    })
  }

  /// Plan for `mode`. Pure: the same mode always yields the same plan.
  pub fn plan(&self, mode: BuildMode) -> OptimizationPlan {
    let minimize = POLICY.minimize.allows(mode);

    OptimizationPlan {
      mode,
      minimize_styles: minimize,
      minimize_scripts: minimize,
      minimize_images: minimize,
      split_chunks: if POLICY.split_all.allows(mode) {
        SplitChunks::All
      } else {
        SplitChunks::None
      },
      runtime_chunk: POLICY
        .runtime_chunk
        .allows(mode)
        .then(|| self.runtime.clone()),
      live_reload: POLICY.live_reload.allows(mode),
      source_maps: if POLICY.full_source_maps.allows(mode) {
        SourceMapStyle::Full
      } else {
        SourceMapStyle::CheapModule
      },
      image_directives: self.config.image_directives.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn planner() -> OptimizationPlanner {
    OptimizationPlanner::new(&OptimizationConfig::default()).unwrap()
  }

  #[test]
  fn production_plan_enables_everything() {
    let plan = planner().plan(BuildMode::Production);
    assert!(plan.minimize_scripts && plan.minimize_styles && plan.minimize_images);
    assert_eq!(plan.split_chunks, SplitChunks::All);
    assert_eq!(plan.source_maps, SourceMapStyle::Full);
    assert!(!plan.live_reload);
    let runtime = plan.runtime_chunk.expect("production extracts the runtime");
    assert_eq!(runtime.name("main"), "runtime~main");
  }

  #[test]
  fn development_plan_skips_optimization() {
    let plan = planner().plan(BuildMode::Development);
    assert!(!plan.minimizes());
    assert_eq!(plan.split_chunks, SplitChunks::None);
    assert!(plan.runtime_chunk.is_none());
    assert!(plan.live_reload);
    assert_eq!(plan.source_maps, SourceMapStyle::CheapModule);
  }

  #[test]
  fn runtime_names_differ_per_entry() {
    let namer = RuntimeChunkNamer::new("runtime~[name]").unwrap();
    assert_ne!(namer.name("main"), namer.name("admin"));
    assert!(RuntimeChunkNamer::new("runtime").is_err());
  }

  #[test]
  fn image_directives_pass_through_verbatim() {
    let plan = planner().plan(BuildMode::Production);
    let options = plan.image_options();
    assert_eq!(options[0], json!(["gifsicle", {"interlaced": true}]));
    assert_eq!(options[2], json!(["optipng", {"optimizationLevel": 5}]));
    assert_eq!(
      options[3][1]["plugins"][2]["params"]["xmlnsOrder"],
      json!("alphabetical")
    );
  }

  #[test]
  fn directives_deserialize_from_pairs() {
    let config: OptimizationConfig = serde_json::from_value(json!({
      "imageDirectives": [["optipng", {"optimizationLevel": 2}]]
    }))
    .unwrap();
    assert_eq!(config.image_directives.len(), 1);
    assert_eq!(config.runtime_chunk, "runtime~[name]");
    assert_eq!(config.minimizers, MinimizerNames::default());
  }
}
