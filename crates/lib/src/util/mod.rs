//! Shared utilities.
//!
//! Common utilities used across the crate including hashing, formatting and
//! test helpers.

pub mod fs;
pub mod hash;

#[cfg(test)]
pub mod testutil;

/// Render a byte count as a human readable label (e.g. `1.5 KB`).
pub fn format_bytes(bytes: u64) -> String {
  const KB: u64 = 1024;
  const MB: u64 = KB * 1024;
  const GB: u64 = MB * 1024;

  if bytes >= GB {
    format!("{:.1} GB", bytes as f64 / GB as f64)
  } else if bytes >= MB {
    format!("{:.1} MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1} KB", bytes as f64 / KB as f64)
  } else {
    format!("{} B", bytes)
  }
}
