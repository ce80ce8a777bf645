//! SHA-256 helpers behind package digests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  hash_parts(&[data])
}

/// Hash several byte slices as if they were one contiguous buffer.
pub fn hash_parts(parts: &[&[u8]]) -> ContentHash {
  let mut hasher = Sha256::new();
  for part in parts {
    hasher.update(part);
  }
  ContentHash(hex::encode(hasher.finalize()))
}
