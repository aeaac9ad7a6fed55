//! Distributes script and style modules over chunks according to the plan.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value, json};

use crate::models::{ModuleClass, ModuleRecord};
use crate::optimize::plan::SplitChunks;
use crate::paths::is_vendor_path;

/// Prefix of chunks holding `node_modules` code.
pub const VENDOR_CHUNK_PREFIX: &str = "vendors";

/// Prefix of chunks holding project code shared by several entries.
pub const COMMON_CHUNK_PREFIX: &str = "common";

/// Role of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
  /// Loaded by exactly one entry and executed last.
  Entry,
  /// Loaded by every entry listed in [`Chunk::entries`].
  Shared,
}

/// A group of modules emitted together.
#[derive(Debug, Clone)]
pub struct Chunk<'m> {
  /// Logical chunk name used for naming.
  pub name: String,
  /// Role of the chunk.
  pub kind: ChunkKind,
  /// Entries loading the chunk.
  pub entries: BTreeSet<String>,
  /// Script modules in execution order.
  pub scripts: Vec<&'m ModuleRecord>,
  /// Extracted style modules in cascade order.
  pub styles: Vec<&'m ModuleRecord>,
}

impl<'m> Chunk<'m> {
  fn new(name: String, kind: ChunkKind, entries: BTreeSet<String>) -> Self {
    Self {
      name,
      kind,
      entries,
      scripts: Vec::new(),
      styles: Vec::new(),
    }
  }

  fn push(&mut self, module: &'m ModuleRecord) {
    match module.class {
      ModuleClass::Style => self.styles.push(module),
      _ => self.scripts.push(module),
    }
  }

  /// Concatenated script source.
  pub fn script_source(&self) -> Vec<u8> {
    concat_modules(&self.scripts)
  }

  /// Concatenated stylesheet source.
  pub fn style_source(&self) -> Vec<u8> {
    concat_modules(&self.styles)
  }
}

/// Entries whose graph reaches `module`.
///
/// An empty `reached_from` means every entry, except for entry files which then belong to
/// their own entry only. Entry names that are not part of the build are ignored and an
/// entry file always belongs to its own entry.
pub fn reaching_entries(
  module: &ModuleRecord,
  entries: &BTreeMap<String, String>,
) -> BTreeSet<String> {
  let own: BTreeSet<String> = entries
    .iter()
    .filter(|(_, path)| **path == module.path)
    .map(|(name, _)| name.clone())
    .collect();

  if module.reached_from.is_empty() {
    return if own.is_empty() {
      entries.keys().cloned().collect()
    } else {
      own
    };
  }

  module
    .reached_from
    .iter()
    .filter(|entry| entries.contains_key(*entry))
    .cloned()
    .chain(own)
    .collect()
}

/// Assign every script and style module to chunks.
///
/// Entry chunks come first in entry order, followed by shared chunks sorted by name.
/// With [`SplitChunks::All`], `node_modules` code moves into a `vendors~..` chunk per
/// set of reaching entries and project code reached by several entries into a
/// `common~..` chunk; with [`SplitChunks::None`] each entry chunk holds everything it
/// reaches. Each entry file is placed last in its entry chunk.
pub fn assemble_chunks<'m>(
  entries: &BTreeMap<String, String>,
  modules: &'m [ModuleRecord],
  split: SplitChunks,
) -> Vec<Chunk<'m>> {
  let mut entry_chunks: BTreeMap<&str, Chunk<'m>> = entries
    .keys()
    .map(|name| {
      (
        name.as_str(),
        Chunk::new(name.clone(), ChunkKind::Entry, BTreeSet::from([name.clone()])),
      )
    })
    .collect();
  let mut shared: BTreeMap<String, Chunk<'m>> = BTreeMap::new();
  let entry_paths: BTreeSet<&str> = entries.values().map(String::as_str).collect();

  let bundled = modules
    .iter()
    .filter(|module| matches!(module.class, ModuleClass::Script | ModuleClass::Style));
  let (entry_modules, dependencies): (Vec<_>, Vec<_>) =
    bundled.partition(|module| entry_paths.contains(module.path.as_str()));

  for module in dependencies.into_iter().chain(entry_modules) {
    let reach = reaching_entries(module, entries);
    if reach.is_empty() {
      continue;
    }

    let shared_prefix = match split {
      SplitChunks::None => None,
      SplitChunks::All if is_vendor_path(&module.path) => Some(VENDOR_CHUNK_PREFIX),
      SplitChunks::All if reach.len() > 1 => Some(COMMON_CHUNK_PREFIX),
      SplitChunks::All => None,
    };

    match shared_prefix {
      Some(prefix) => {
        let name = shared_chunk_name(prefix, &reach);
        shared
          .entry(name.clone())
          .or_insert_with(|| Chunk::new(name, ChunkKind::Shared, reach.clone()))
          .push(module);
      }
      None => {
        for entry in &reach {
          if let Some(chunk) = entry_chunks.get_mut(entry.as_str()) {
            chunk.push(module);
          }
        }
      }
    }
  }

  entry_chunks.into_values().chain(shared.into_values()).collect()
}

fn shared_chunk_name(prefix: &str, reach: &BTreeSet<String>) -> String {
  let mut name = prefix.to_string();
  for entry in reach {
    name.push('~');
    name.push_str(entry);
  }
  name
}

fn concat_modules(modules: &[&ModuleRecord]) -> Vec<u8> {
  let mut out = Vec::new();
  for module in modules {
    out.extend_from_slice(format!("/* {} */\n", module.path).as_bytes());
    out.extend_from_slice(&module.content);
    if !module.content.ends_with(b"\n") {
      out.push(b'\n');
    }
  }
  out
}

/// Bootstrap that registers an entry and the script files it loads, in load order.
pub fn runtime_source(entry: &str, files: &[String], live_reload: bool) -> String {
  let record = json!({ "files": files, "liveReload": live_reload });
  format!(
    concat!(
      "(function (global) {{\n",
      "  var pipeline = global.__assetPipeline\n",
      "    || (global.__assetPipeline = {{ entries: {{}} }});\n",
      "  pipeline.entries[{entry}] = {record};\n",
      "}})(self);\n",
    ),
    entry = Value::String(entry.to_string()),
    record = record,
  )
}
