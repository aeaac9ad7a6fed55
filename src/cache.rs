//! Memoized transform results keyed on content, chain and mode.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::mode::BuildMode;
use crate::output::ContentHash;
use crate::transform::{ContentFormat, TransformChain};

/// Output of a chain run, as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTransform {
  /// Content after the last step.
  pub content: Vec<u8>,
  /// Format after the last step.
  pub format: ContentFormat,
  /// Warnings reported by the steps.
  pub warnings: Vec<String>,
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
  /// Lookups answered from the cache.
  pub hits: u64,
  /// Lookups that ran the chain.
  pub misses: u64,
}

/// Concurrent cache shared by the per-file workers.
///
/// Invalidation is purely content based: a changed file, path, chain or mode yields a new
/// key. The path is part of the key because executors see it.
#[derive(Debug, Default)]
pub struct TransformCache {
  entries: DashMap<ContentHash, CachedTransform>,
  hits: AtomicU64,
  misses: AtomicU64,
}

impl TransformCache {
  /// Create an empty cache.
  pub fn new() -> Self {
    Self::default()
  }

  /// Cache key for running `chain` over the file at `path`, whose content hashes to
  /// `content`, in `mode`.
  pub fn key(
    content: ContentHash,
    path: &str,
    chain: &TransformChain,
    mode: BuildMode,
  ) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content.as_bytes());
    hasher.update(&(path.len() as u64).to_le_bytes());
    hasher.update(path.as_bytes());
    hasher.update(chain.fingerprint().as_bytes());
    hasher.update(mode.as_str().as_bytes());
    hasher.finalize().into()
  }

  /// Return the cached value for `key`, or compute and store it.
  ///
  /// Errors are not cached. Two workers missing on the same key may both compute it; the
  /// results are identical so the later insert is harmless.
  pub fn get_or_try_insert<E>(
    &self,
    key: ContentHash,
    compute: impl FnOnce() -> Result<CachedTransform, E>,
  ) -> Result<CachedTransform, E> {
    if let Some(hit) = self.entries.get(&key) {
      self.hits.fetch_add(1, Ordering::Relaxed);
      return Ok(hit.value().clone());
    }

    self.misses.fetch_add(1, Ordering::Relaxed);
    let value = compute()?;
    self.entries.insert(key, value.clone());
    Ok(value)
  }

  /// Counters since creation or the last [`TransformCache::clear`].
  pub fn stats(&self) -> CacheStats {
    CacheStats {
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
    }
  }

  /// Number of cached results.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns `true` when nothing is cached.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Drop every entry and reset the counters.
  pub fn clear(&self) {
    self.entries.clear();
    self.hits.store(0, Ordering::Relaxed);
    self.misses.store(0, Ordering::Relaxed);
  }
}
