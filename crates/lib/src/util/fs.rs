//! Filesystem helpers shared by the source provider and the registry.

use std::fs;
use std::io;
use std::path::Path;

use rand::Rng;
use rand::distributions::Alphanumeric;
use walkdir::WalkDir;

/// Write a file atomically (write to a sibling temp file, then rename).
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
  let file_name = path
    .file_name()
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
  let temp_path = path.with_file_name(format!("{}.{}.tmp", file_name.to_string_lossy(), random_name(6)));

  fs::write(&temp_path, content)?;
  if let Err(e) = fs::rename(&temp_path, path) {
    let _ = fs::remove_file(&temp_path);
    return Err(e);
  }
  Ok(())
}

/// Recursively copy the contents of `from` into `to`.
///
/// Symlinks are recreated on unix and followed elsewhere.
pub fn copy_dir(from: &Path, to: &Path) -> io::Result<()> {
  fs::create_dir_all(to)?;

  for entry in WalkDir::new(from).sort_by_file_name() {
    let entry = entry.map_err(io::Error::other)?;
    let rel = entry.path().strip_prefix(from).map_err(io::Error::other)?;
    if rel.as_os_str().is_empty() {
      continue;
    }
    let dest = to.join(rel);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      fs::create_dir_all(&dest)?;
    } else if file_type.is_symlink() {
      #[cfg(unix)]
      {
        let target = fs::read_link(entry.path())?;
        std::os::unix::fs::symlink(target, &dest)?;
      }
      #[cfg(not(unix))]
      {
        fs::copy(entry.path(), &dest)?;
      }
    } else {
      fs::copy(entry.path(), &dest)?;
    }
  }

  Ok(())
}

/// Generate a random alphanumeric name of the given length.
pub fn random_name(len: usize) -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(len)
    .map(char::from)
    .collect::<String>()
    .to_lowercase()
}
