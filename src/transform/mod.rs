//! Transform steps, chains and the executor registry.

pub mod builtins;
mod chain;
mod registry;
mod step;

pub use chain::{AssetStrategy, FileMeta, TransformChain, TransformChainBuilder};
pub use registry::{
  ContentFormat, MinimizeInput, Minimizer, TransformExecutor, TransformInput, TransformOutput,
  TransformRegistry,
};
pub use step::{
  MODE_BRANCH_KEY, THEME_REFERENCE, TransformStep, TransformStepTemplate, by_mode,
  resolve_options,
};
