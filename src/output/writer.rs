//! Writes named artifacts into the output directory.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use same_file::is_same_file;
use tracing::{debug, info};

use crate::models::Artifact;

/// Write every artifact below `out_dir`, returning the written paths.
///
/// With `clean` set, files in `out_dir` that are not part of this build are removed first,
/// along with directories left empty. Artifacts that still match their original file are
/// linked or copied from it instead of being rewritten.
pub fn write_artifacts(
  artifacts: &[Artifact],
  out_dir: &Path,
  clean: bool,
) -> Result<Vec<PathBuf>> {
  fs::create_dir_all(out_dir)
    .with_context(|| format!("failed to create {}", out_dir.display()))?;

  if clean {
    let keep: BTreeSet<PathBuf> = artifacts
      .iter()
      .map(|artifact| PathBuf::from(artifact.file_path()))
      .collect();
    prune_output_tree(out_dir, &keep)
      .with_context(|| format!("failed to clean {}", out_dir.display()))?;
  }

  let mut written = Vec::with_capacity(artifacts.len());
  for artifact in artifacts {
    let destination = out_dir.join(artifact.file_path());
    if let Some(parent) = destination.parent() {
      fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    match &artifact.origin {
      Some(origin) => install_untouched(origin, &destination),
      None => write_fresh(&destination, &artifact.content),
    }
    .with_context(|| format!("failed to write {}", destination.display()))?;

    debug!(path = %artifact.path, size = artifact.size(), "wrote artifact");
    written.push(destination);
  }

  info!(count = written.len(), dir = %out_dir.display(), "emitted build output");
  Ok(written)
}

fn prune_output_tree(root: &Path, keep_files: &BTreeSet<PathBuf>) -> std::io::Result<()> {
  if !root.exists() {
    return Ok(());
  }

  prune_output_subtree(root, Path::new(""), keep_files)?;
  Ok(())
}

/// Returns `true` when the directory at `relative` ended up with nothing worth keeping.
fn prune_output_subtree(
  root: &Path,
  relative: &Path,
  keep_files: &BTreeSet<PathBuf>,
) -> std::io::Result<bool> {
  let current = root.join(relative);
  let entries = match fs::read_dir(&current) {
    Ok(entries) => entries,
    Err(err) if err.kind() == ErrorKind::NotFound => return Ok(true),
    Err(err) => return Err(err),
  };

  let mut kept_any = false;
  for entry in entries {
    let entry = entry?;
    let child = relative.join(entry.file_name());
    let entry_path = entry.path();

    if entry.file_type()?.is_dir() {
      if prune_output_subtree(root, &child, keep_files)? {
        fs::remove_dir_all(&entry_path)?;
      } else {
        kept_any = true;
      }
    } else if keep_files.contains(&child) {
      kept_any = true;
    } else {
      debug!(path = %entry_path.display(), "removing stale output");
      fs::remove_file(&entry_path)?;
    }
  }

  Ok(!kept_any && !relative.as_os_str().is_empty())
}

/// Replaces the file instead of writing through it, since it may be a link to a source file.
fn write_fresh(destination: &Path, content: &[u8]) -> std::io::Result<()> {
  match fs::remove_file(destination) {
    Ok(()) => {}
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => return Err(err),
  }
  fs::write(destination, content)
}

fn install_untouched(source: &Path, destination: &Path) -> std::io::Result<()> {
  if destination.exists() {
    if is_same_file(source, destination)? {
      return Ok(());
    }
    fs::remove_file(destination)?;
  }

  match fs::hard_link(source, destination) {
    Ok(()) => Ok(()),
    Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
    Err(_) => fs::copy(source, destination).map(|_| ()),
  }
}
