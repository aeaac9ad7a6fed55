//! Content hashing for output names and cache keys.

use std::fmt;

/// A 256-bit blake3 content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
  /// Hash `content`.
  pub fn of(content: &[u8]) -> Self {
    Self(*blake3::hash(content).as_bytes())
  }

  /// Raw bytes.
  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }

  /// Full lowercase hex representation.
  pub fn to_hex(self) -> String {
    blake3::Hash::from(self.0).to_hex().to_string()
  }

  /// Hex prefix of `len` characters, clamped to the full hash length.
  pub fn short(self, len: usize) -> String {
    let hex = self.to_hex();
    hex[..len.min(hex.len())].to_string()
  }
}

impl From<blake3::Hash> for ContentHash {
  fn from(hash: blake3::Hash) -> Self {
    Self(*hash.as_bytes())
  }
}

impl fmt::Display for ContentHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short(16))
  }
}
