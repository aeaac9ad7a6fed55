//! Output naming, content hashing and writing.

mod hash;
mod namer;
mod writer;

pub use hash::ContentHash;
pub use namer::{
  HashLengths, LogicalName, MAX_HASH_LENGTH, NamingSurface, OutputNamer, OutputTemplates,
  validate_template,
};
pub use writer::write_artifacts;
