//! Collects the source files of a project from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::SourceFile;

/// Read every file below `root/<dir>` for each of `dirs`.
///
/// Paths are relative to `root` with forward slashes and the result is sorted by path.
/// Hidden entries are skipped. Each file keeps its on-disk location as its origin so
/// untouched output can be linked instead of copied.
pub fn collect_sources(root: &Path, dirs: &[String]) -> Result<Vec<SourceFile>> {
  let mut files = Vec::new();
  for dir in dirs {
    let start = root.join(dir);
    if !start.exists() {
      debug!(dir = %start.display(), "source directory does not exist");
      continue;
    }
    walk(root, &start, &mut files)?;
  }

  files.sort_by(|a, b| a.path.cmp(&b.path));
  files.dedup_by(|a, b| a.path == b.path);
  Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<SourceFile>) -> Result<()> {
  for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
    let entry = entry?;
    let name = entry.file_name();
    if name.to_string_lossy().starts_with('.') {
      continue;
    }

    let path = entry.path();
    let file_type = entry.file_type()?;
    if file_type.is_dir() {
      walk(root, &path, files)?;
      continue;
    }
    if !file_type.is_file() {
      continue;
    }

    let relative = path.strip_prefix(root).unwrap_or(&path);
    let content = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    files.push(SourceFile::new(&relative.to_string_lossy(), content).with_origin(path.clone()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn collects_nested_files_relative_to_the_root() -> Result<()> {
    let temp = tempdir()?;
    let root = temp.path();
    fs::create_dir_all(root.join("src/components"))?;
    fs::create_dir_all(root.join("src/.cache"))?;
    fs::write(root.join("src/main.js"), "main")?;
    fs::write(root.join("src/components/button.jsx"), "button")?;
    fs::write(root.join("src/.cache/skip.js"), "skip")?;
    fs::write(root.join("README.md"), "outside")?;

    let files = collect_sources(root, &["src".into(), "missing".into()])?;
    let paths: Vec<&str> = files.iter().map(|file| file.path.as_str()).collect();
    assert_eq!(paths, vec!["src/components/button.jsx", "src/main.js"]);
    assert_eq!(files[1].content, b"main");
    assert_eq!(files[1].origin.as_deref(), Some(root.join("src/main.js").as_path()));
    Ok(())
  }
}
