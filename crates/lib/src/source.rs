//! Source tree acquisition.
//!
//! A build starts from one of:
//! - a remote git URL, cloned into a fresh temporary directory
//! - a local repository, opened in place and never written to
//! - a local tree copied into a temporary directory first (`copy`), which
//!   need not be a repository at all
//!
//! Temporary directories live as long as the returned [`Source`].

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::manifest::{Manifest, ManifestError};
use crate::util::fs::copy_dir;

/// Username paired with a token when authenticating a clone.
const TOKEN_USER: &str = "artisan";

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("invalid repository url '{url}': {source}")]
  InvalidUrl {
    url: String,
    #[source]
    source: url::ParseError,
  },

  #[error("failed to clone '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("{path} is not a git repository, pass copy to package it anyway: {source}")]
  NotARepository {
    path: PathBuf,
    #[source]
    source: Box<gix::discover::Error>,
  },

  #[error("repository at {0} has no commits")]
  NoCommits(PathBuf),

  #[error("failed to resolve HEAD in {path}: {message}")]
  Head { path: PathBuf, message: String },

  #[error("source path does not exist: {0}")]
  PathNotFound(PathBuf),

  #[error("'{0}' must be a local path, not a remote resource")]
  RemotePath(String),

  #[error("failed to prepare working directory: {0}")]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

/// What to build from.
#[derive(Debug, Clone, Default)]
pub struct SourceRequest {
  /// Git URL or local path.
  pub from: String,
  /// Directory below the source root holding the manifest.
  pub sub_path: Option<String>,
  /// Password-equivalent credential for remote clones.
  pub token: Option<String>,
  /// Copy a local tree into an isolated directory before building.
  pub copy: bool,
  /// Package this path directly instead of loading a manifest.
  pub target: Option<String>,
}

/// A prepared source tree.
#[derive(Debug)]
pub struct Source {
  pub work_dir: PathBuf,
  pub load_dir: PathBuf,
  pub manifest: Manifest,
  /// Head commit; empty for copied trees without git metadata.
  pub commit: String,
  pub branch: Option<String>,
  /// Keeps isolated clones and copies alive.
  _scratch: Option<TempDir>,
}

pub fn is_remote(from: &str) -> bool {
  ["http://", "https://", "ssh://", "git://", "git@"]
    .iter()
    .any(|prefix| from.starts_with(prefix))
}

/// Acquire the source tree described by `req`.
///
/// Isolated directories are created under `scratch`.
pub fn prepare(req: &SourceRequest, scratch: &Path) -> Result<Source, SourceError> {
  std::fs::create_dir_all(scratch)?;

  let (work_dir, temp, repo) = if is_remote(&req.from) {
    let temp = tempfile::Builder::new().prefix("src-").tempdir_in(scratch)?;
    let url = authenticated_url(&req.from, req.token.as_deref())?;
    info!(from = %req.from, path = %temp.path().display(), "cloning source");
    let repo = clone(&url, &req.from, temp.path())?;
    (temp.path().to_path_buf(), Some(temp), Some(repo))
  } else {
    let path = Path::new(&req.from);
    if !path.exists() {
      return Err(SourceError::PathNotFound(path.to_path_buf()));
    }
    let path = dunce::canonicalize(path)?;

    if req.copy {
      // provenance comes from the original tree, the copy may be a subdirectory
      let repo = gix::discover(&path).ok();
      if repo.is_none() {
        debug!(path = %path.display(), "copied tree has no git metadata");
      }
      let temp = tempfile::Builder::new().prefix("src-").tempdir_in(scratch)?;
      info!(from = %path.display(), path = %temp.path().display(), "copying source");
      copy_dir(&path, temp.path())?;
      (temp.path().to_path_buf(), Some(temp), repo)
    } else {
      let repo = gix::discover(&path).map_err(|e| SourceError::NotARepository {
        path: path.clone(),
        source: Box::new(e),
      })?;
      debug!(path = %path.display(), "opened repository in place");
      (path, None, Some(repo))
    }
  };

  let (commit, branch) = match &repo {
    Some(repo) => (head_commit(repo, &work_dir)?, branch(repo)),
    None => (String::new(), None),
  };

  let load_dir = match req.sub_path.as_deref().filter(|p| !p.is_empty()) {
    Some(sub) => work_dir.join(sub),
    None => work_dir.clone(),
  };

  let manifest = match req.target.as_deref().filter(|t| !t.is_empty()) {
    Some(target) => Manifest::content_only(target),
    None => Manifest::load(&load_dir)?,
  };

  Ok(Source {
    work_dir,
    load_dir,
    manifest,
    commit,
    branch,
    _scratch: temp,
  })
}

/// Embed `token` as the password of `url`.
pub fn authenticated_url(url: &str, token: Option<&str>) -> Result<String, SourceError> {
  let Some(token) = token.filter(|t| !t.is_empty()) else {
    return Ok(url.to_string());
  };
  let invalid = |source| SourceError::InvalidUrl {
    url: url.to_string(),
    source,
  };

  let mut parsed = Url::parse(url).map_err(invalid)?;
  // set_* only fail for urls that cannot carry credentials
  if parsed.set_username(TOKEN_USER).is_err() || parsed.set_password(Some(token)).is_err() {
    return Err(invalid(url::ParseError::EmptyHost));
  }
  Ok(parsed.into())
}

fn clone(url: &str, display: &str, dest: &Path) -> Result<gix::Repository, SourceError> {
  let clone_err = |e: Box<dyn std::error::Error + Send + Sync>| SourceError::Clone {
    url: display.to_string(),
    source: e,
  };

  let mut prepared = gix::prepare_clone(url, dest).map_err(|e| clone_err(Box::new(e)))?;
  let (mut checkout, _) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| clone_err(Box::new(e)))?;
  let (repo, _) = checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| clone_err(Box::new(e)))?;
  Ok(repo)
}

fn head_commit(repo: &gix::Repository, path: &Path) -> Result<String, SourceError> {
  let head_err = |message: String| SourceError::Head {
    path: path.to_path_buf(),
    message,
  };

  let mut head = repo.head().map_err(|e| head_err(e.to_string()))?;
  if head.is_unborn() {
    return Err(SourceError::NoCommits(path.to_path_buf()));
  }
  let commit = head.peel_to_commit().map_err(|e| head_err(e.to_string()))?;
  Ok(commit.id.to_string())
}

/// Head commit of the repository containing `path`, if there is one.
pub fn local_commit(path: &Path) -> Option<String> {
  let repo = gix::discover(path).ok()?;
  head_commit(&repo, path).ok()
}

fn branch(repo: &gix::Repository) -> Option<String> {
  let name = repo.head_name().ok()??;
  Some(name.shorten().to_string())
}
