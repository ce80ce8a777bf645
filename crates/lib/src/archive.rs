//! Deterministic zip packaging of a target directory.
//!
//! Entries are written in sorted order with a fixed timestamp so the same tree
//! always produces the same bytes. Paths listed in the project's ignore file
//! are left out, and the ignore file itself never ships.
//!
//! # Ignore File
//!
//! One entry per line, relative to the directory holding the manifest. Blank
//! lines and lines starting with `#` are skipped. Lines containing glob
//! metacharacters are matched as globs; all others exclude the named path and
//! everything below it.

use std::fs;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::consts::IGNORE_FILE;

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("target {0} is not a directory")]
  NotADirectory(PathBuf),

  #[error("invalid ignore pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: globset::Error,
  },

  #[error("archive entry escapes destination: {0}")]
  UnsafeEntry(String),

  #[error("failed to walk directory: {0}")]
  Walk(#[from] walkdir::Error),

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

/// Absolute paths and globs excluded from an archive.
#[derive(Debug, Clone)]
pub struct IgnoreList {
  paths: Vec<PathBuf>,
  globs: GlobSet,
}

impl Default for IgnoreList {
  fn default() -> Self {
    Self {
      paths: Vec::new(),
      globs: GlobSet::empty(),
    }
  }
}

impl IgnoreList {
  /// Read the ignore file in `base`, if any.
  ///
  /// The ignore file's own path is always part of the list.
  pub fn read(base: &Path) -> Result<Self, ArchiveError> {
    let base = dunce::canonicalize(base)?;
    let file = base.join(IGNORE_FILE);
    let content = match fs::read_to_string(&file) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
      Err(e) => return Err(e.into()),
    };
    Self::from_lines(&base, content.lines())
  }

  /// Build a list from ignore file lines relative to `base`.
  pub fn from_lines<'a>(base: &Path, lines: impl IntoIterator<Item = &'a str>) -> Result<Self, ArchiveError> {
    let mut paths = vec![base.join(IGNORE_FILE)];
    let mut globs = GlobSetBuilder::new();

    for line in lines {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      let rel = line.trim_start_matches("./").trim_end_matches('/');
      let abs = base.join(rel);

      if rel.contains(['*', '?', '[', '{']) {
        let pattern = abs.to_string_lossy().into_owned();
        let glob = Glob::new(&pattern).map_err(|source| ArchiveError::InvalidPattern {
          pattern: line.to_string(),
          source,
        })?;
        globs.add(glob);
      } else {
        paths.push(abs);
      }
    }

    let globs = globs.build().map_err(|source| ArchiveError::InvalidPattern {
      pattern: "<set>".to_string(),
      source,
    })?;
    Ok(Self { paths, globs })
  }

  /// True when `path` (absolute) or one of its ancestors is ignored.
  pub fn is_ignored(&self, path: &Path) -> bool {
    self.paths.iter().any(|p| path.starts_with(p)) || self.globs.is_match(path)
  }

  pub fn paths(&self) -> &[PathBuf] {
    &self.paths
  }
}

/// Compress `target` into zip bytes.
pub fn archive(target: &Path, ignore: &IgnoreList) -> Result<Vec<u8>, ArchiveError> {
  if !target.is_dir() {
    return Err(ArchiveError::NotADirectory(target.to_path_buf()));
  }
  let root = dunce::canonicalize(target)?;

  let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
  let base_options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .last_modified_time(DateTime::default());

  let walker = WalkDir::new(&root)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| {
      let ignored = ignore.is_ignored(e.path());
      if ignored {
        trace!(path = %e.path().display(), "ignored");
      }
      !ignored
    });

  let mut files = 0usize;
  for entry in walker {
    let entry = entry?;
    let rel = entry.path().strip_prefix(&root).map_err(io::Error::other)?;
    if rel.as_os_str().is_empty() {
      continue;
    }
    let name = entry_name(rel);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      zip.add_directory(name, base_options.unix_permissions(0o755))?;
    } else if file_type.is_symlink() {
      let link = fs::read_link(entry.path())?;
      zip.add_symlink(name, link.to_string_lossy(), base_options)?;
    } else {
      zip.start_file(name, base_options.unix_permissions(mode(&entry.metadata().map_err(io::Error::other)?)))?;
      let mut file = fs::File::open(entry.path())?;
      io::copy(&mut file, &mut zip)?;
      files += 1;
    }
  }

  let bytes = zip.finish()?.into_inner();
  debug!(target = %root.display(), files, bytes = bytes.len(), "archived target");
  Ok(bytes)
}

/// Extract zip `bytes` into `dest`.
pub fn extract(bytes: &[u8], dest: &Path) -> Result<(), ArchiveError> {
  extract_from(Cursor::new(bytes), dest)
}

pub fn extract_from<R: Read + Seek>(reader: R, dest: &Path) -> Result<(), ArchiveError> {
  fs::create_dir_all(dest)?;
  let mut archive = ZipArchive::new(reader)?;

  for i in 0..archive.len() {
    let mut entry = archive.by_index(i)?;
    let rel = entry
      .enclosed_name()
      .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_string()))?;
    ensure_no_symlink(dest, &rel)?;
    let path = dest.join(&rel);

    if entry.is_dir() {
      fs::create_dir_all(&path)?;
      continue;
    }
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }

    if entry.is_symlink() {
      let mut target = String::new();
      entry.read_to_string(&mut target)?;
      check_link_target(&rel, &target)?;
      #[cfg(unix)]
      std::os::unix::fs::symlink(&target, &path)?;
      #[cfg(not(unix))]
      fs::write(&path, target)?;
      continue;
    }

    let mut out = fs::File::create(&path)?;
    io::copy(&mut entry, &mut out)?;
    out.flush()?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&path, fs::Permissions::from_mode(mode & 0o7777))?;
      }
    }
  }

  debug!(dest = %dest.display(), entries = archive.len(), "extracted archive");
  Ok(())
}

/// Refuse entries whose path crosses, or lands on, a symlink already
/// extracted under `dest`.
fn ensure_no_symlink(dest: &Path, rel: &Path) -> Result<(), ArchiveError> {
  let mut current = dest.to_path_buf();
  for component in rel.components() {
    current.push(component);
    let is_link = fs::symlink_metadata(&current)
      .map(|m| m.file_type().is_symlink())
      .unwrap_or(false);
    if is_link {
      return Err(ArchiveError::UnsafeEntry(rel.display().to_string()));
    }
  }
  Ok(())
}

/// A link target must resolve inside the extracted tree.
fn check_link_target(rel: &Path, target: &str) -> Result<(), ArchiveError> {
  let unsafe_link = || ArchiveError::UnsafeEntry(format!("{} -> {target}", rel.display()));
  let mut depth = rel.components().count().saturating_sub(1);
  for component in Path::new(target).components() {
    match component {
      Component::Normal(_) => depth += 1,
      Component::CurDir => {}
      Component::ParentDir if depth > 0 => depth -= 1,
      _ => return Err(unsafe_link()),
    }
  }
  Ok(())
}

fn entry_name(rel: &Path) -> String {
  rel
    .components()
    .filter_map(|c| match c {
      Component::Normal(s) => Some(s.to_string_lossy()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}

#[cfg(unix)]
fn mode(meta: &fs::Metadata) -> u32 {
  use std::os::unix::fs::PermissionsExt;
  meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode(_: &fs::Metadata) -> u32 {
  0o644
}
