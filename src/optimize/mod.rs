//! Whole-graph optimization: the per-mode plan and chunk assembly.

mod chunks;
mod plan;

pub use chunks::{
  COMMON_CHUNK_PREFIX, Chunk, ChunkKind, VENDOR_CHUNK_PREFIX, assemble_chunks, reaching_entries,
  runtime_source,
};
pub use plan::{
  ENTRY_NAME_PLACEHOLDER, ImageDirective, MinimizerNames, OptimizationConfig, OptimizationPlan,
  OptimizationPlanner, RuntimeChunkNamer, SourceMapStyle, SplitChunks,
};
