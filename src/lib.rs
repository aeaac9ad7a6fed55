#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod html;
pub mod logging;
pub mod manifest;
pub mod mode;
pub mod models;
pub mod optimize;
pub mod output;
pub mod paths;
pub mod rules;
pub mod sources;
pub mod transform;

pub use builder::{BuildOrchestrator, BuildParams, BuildResult};
pub use config::{BuildContext, PipelineConfig};
pub use error::{ConfigError, PipelineError, StepError};
pub use manifest::{AssetManifest, load_manifest};
pub use mode::{BuildMode, ModeCondition};
pub use models::{Artifact, ArtifactKind, BuildWarning, SourceFile, WarningKind};
pub use optimize::{OptimizationPlan, OptimizationPlanner};
pub use rules::{RuleMatcher, RuleTable};
pub use transform::{TransformChain, TransformRegistry};
