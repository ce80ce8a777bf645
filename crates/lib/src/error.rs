//! Crate-level error taxonomy.
//!
//! Module errors convert into [`Error`] with `?`. Conversions lift the cases
//! callers usually branch on (manifest problems found while preparing a
//! source, integrity and authentication failures found by the registry, a
//! target that never appeared) into their own variants.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::config::ConfigError;
use crate::execute::{ExecuteError, WaitError};
use crate::keys::KeyError;
use crate::manifest::ManifestError;
use crate::platform::PlatformMismatch;
use crate::registry::RegistryError;
use crate::seal::SealError;
use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Source(SourceError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Execution(#[from] ExecuteError),

  #[error("build target {path} did not appear within {waited:?}")]
  BuildTimeout { path: PathBuf, waited: Duration },

  #[error("wait for build target {0} was cancelled")]
  Cancelled(PathBuf),

  #[error("packaging failed: {0}")]
  Packaging(#[from] ArchiveError),

  #[error("profile '{profile}' declares no target to package")]
  MissingTarget { profile: String },

  #[error("integrity check failed for '{name}': {source}")]
  Integrity {
    name: String,
    #[source]
    source: SealError,
  },

  #[error("authentication failed for '{name}': {source}")]
  Authentication {
    name: String,
    #[source]
    source: SealError,
  },

  #[error(transparent)]
  PlatformMismatch(#[from] PlatformMismatch),

  #[error("function '{function}' is not exported by package '{package}'")]
  FunctionNotExported { package: String, function: String },

  #[error("function '{0}' is not defined in the manifest")]
  FunctionNotFound(String),

  #[error(transparent)]
  Registry(RegistryError),

  #[error("function '{function}' exceeded the maximum call depth of {max}")]
  CallDepthExceeded { function: String, max: usize },

  #[error(transparent)]
  Seal(#[from] SealError),

  #[error(transparent)]
  Key(#[from] KeyError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl From<SourceError> for Error {
  fn from(e: SourceError) -> Self {
    match e {
      SourceError::Manifest(m) => Self::Manifest(m),
      other => Self::Source(other),
    }
  }
}

impl From<RegistryError> for Error {
  fn from(e: RegistryError) -> Self {
    match e {
      RegistryError::Integrity { name, source } => Self::Integrity { name, source },
      RegistryError::Authentication { name, source } => Self::Authentication { name, source },
      RegistryError::Archive(a) => Self::Packaging(a),
      other => Self::Registry(other),
    }
  }
}

impl From<WaitError> for Error {
  fn from(e: WaitError) -> Self {
    match e {
      WaitError::Timeout { path, waited } => Self::BuildTimeout { path, waited },
      WaitError::Cancelled { path } => Self::Cancelled(path),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
