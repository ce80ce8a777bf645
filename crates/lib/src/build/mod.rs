//! The build engine.
//!
//! A [`Builder`] ties the pipeline together:
//!
//! 1. [`Builder::build`] prepares a source tree, runs a profile, archives its
//!    target, seals the archive and registers it.
//! 2. [`Builder::run`] runs a function from a manifest on disk.
//! 3. [`Builder::execute`] opens a sealed package and runs one of its exported
//!    functions.
//!
//! Every invocation works in its own temporary directory under the
//! configured home and removes it on the way out.

mod package;
mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use package::unique_id;

use crate::archive::{self, IgnoreList};
use crate::config::Config;
use crate::consts::{ENV_BUILD_PATH, ENV_FROM_URI, ENV_GIT_COMMIT, ENV_REF, ENV_WORK_DIR};
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::execute::Shell;
use crate::input::{InputProvider, NonInteractive};
use crate::keys::KeyStore;
use crate::manifest::Manifest;
use crate::platform::{check_platform, os::Os};
use crate::registry::{Credentials, Entry, PackageName, Registry};
use crate::seal::{AuditEvent, AuditStrategy, LogAudit, Seal, SignStrategy, VerifyStrategy};
use crate::source::{self, SourceError, SourceRequest};
use crate::util::fs::random_name;

/// Parameters of [`Builder::build`].
#[derive(Debug, Clone)]
pub struct BuildRequest {
  pub source: SourceRequest,
  pub name: PackageName,
  /// Profile to run; the default or first profile when `None`.
  pub profile: Option<String>,
  pub interactive: bool,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
  pub entry: Entry,
  pub seal: Seal,
}

/// Parameters of [`Builder::execute`].
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
  pub name: PackageName,
  pub function: String,
  pub credentials: Option<Credentials>,
  pub interactive: bool,
  /// Extraction directory; a random directory under the run area when `None`.
  pub path: Option<PathBuf>,
  pub preserve_files: bool,
  pub env: Environment,
}

impl ExecuteRequest {
  pub fn new(name: PackageName, function: impl Into<String>) -> Self {
    Self {
      name,
      function: function.into(),
      credentials: None,
      interactive: false,
      path: None,
      preserve_files: false,
      env: Environment::new(),
    }
  }
}

pub struct Builder {
  config: Config,
  registry: Arc<Registry>,
  keys: KeyStore,
  shell: Shell,
  audit: Box<dyn AuditStrategy>,
  inputs: Box<dyn InputProvider>,
  require_signature: bool,
  cancel: CancellationToken,
}

/// Per-invocation state shared by a profile and the functions it calls.
pub(crate) struct Invocation<'a> {
  pub manifest: &'a Manifest,
  pub exec_dir: &'a Path,
  pub interactive: bool,
  /// `ARTISAN_*` variables visible to every statement.
  pub injected: Environment,
}

impl Builder {
  pub fn new(config: Config, registry: Arc<Registry>) -> Self {
    Self {
      keys: KeyStore::new(config.keys_dir()),
      shell: Shell::resolve(config.shell.as_deref()),
      config,
      registry,
      audit: Box::new(LogAudit),
      inputs: Box::new(NonInteractive),
      require_signature: false,
      cancel: CancellationToken::new(),
    }
  }

  pub fn with_audit(mut self, audit: Box<dyn AuditStrategy>) -> Self {
    self.audit = audit;
    self
  }

  pub fn with_input_provider(mut self, inputs: Box<dyn InputProvider>) -> Self {
    self.inputs = inputs;
    self
  }

  /// Refuse to open packages without a verifiable signature.
  pub fn require_signature(mut self, require: bool) -> Self {
    self.require_signature = require;
    self
  }

  /// Token that interrupts the wait for a build target.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn keys(&self) -> &KeyStore {
    &self.keys
  }

  /// Build, seal and register a package.
  pub async fn build(&self, req: BuildRequest) -> Result<BuildOutcome> {
    let scratch = self.config.build_dir();
    let source_req = req.source.clone();
    let source = tokio::task::spawn_blocking(move || source::prepare(&source_req, &scratch))
      .await
      .map_err(std::io::Error::other)??;

    let reference = unique_id(&source.commit);
    let from_uri = if source::is_remote(&req.source.from) {
      req.source.from.clone()
    } else {
      dunce::canonicalize(&req.source.from)?.to_string_lossy().into_owned()
    };
    info!(package = %req.name, reference = %reference, "building package");

    let inv = Invocation {
      manifest: &source.manifest,
      exec_dir: &source.load_dir,
      interactive: req.interactive,
      injected: Environment::from_pairs([
        (ENV_REF, reference.clone()),
        (ENV_BUILD_PATH, source.load_dir.to_string_lossy().into_owned()),
        (ENV_GIT_COMMIT, source.commit.clone()),
        (ENV_WORK_DIR, source.work_dir.to_string_lossy().into_owned()),
        (ENV_FROM_URI, from_uri.clone()),
      ]),
    };

    let outcome = self.run_profile(&inv, req.profile.as_deref()).await?;
    let target = outcome.target.ok_or_else(|| Error::MissingTarget {
      profile: outcome.profile.name.clone(),
    })?;

    let ignore = IgnoreList::read(&source.load_dir)?;
    let bytes = archive::archive(&target, &ignore)?;

    let manifest = package::package_manifest(package::PackageInfo {
      manifest: &source.manifest,
      profile: &outcome.profile,
      target: &target,
      reference: &reference,
      source: &from_uri,
      commit: &source.commit,
      branch: source.branch.as_deref(),
      archive_len: bytes.len(),
    })?;

    let signer = self.keys.signer(&req.name.key_scope())?;
    let seal = Seal::create(
      manifest,
      &bytes,
      self.registry.digest_strategy().as_ref(),
      signer.as_ref().map(|s| s as &dyn SignStrategy),
    )?;
    let entry = self.registry.add_bytes(&bytes, &req.name, &seal)?;

    info!(package = %req.name, digest = %seal.digest, size = %seal.manifest.size, "package built");
    Ok(BuildOutcome { entry, seal })
  }

  /// Run `function` from the manifest in `path` (default: current directory).
  pub async fn run(&self, function: &str, path: Option<&str>, interactive: bool, env: &Environment) -> Result<()> {
    let path = path.filter(|p| !p.is_empty()).unwrap_or(".");
    if path.starts_with("http") {
      return Err(SourceError::RemotePath(path.to_string()).into());
    }
    let path = dunce::canonicalize(path)?;
    self.run_at(function, &path, interactive, env).await
  }

  async fn run_at(&self, function: &str, path: &Path, interactive: bool, extra: &Environment) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let commit = source::local_commit(path).unwrap_or_default();
    let path_str = path.to_string_lossy().into_owned();

    let inv = Invocation {
      manifest: &manifest,
      exec_dir: path,
      interactive,
      injected: Environment::from_pairs([
        (ENV_REF, unique_id(&commit)),
        (ENV_BUILD_PATH, path_str.clone()),
        (ENV_GIT_COMMIT, commit),
        (ENV_WORK_DIR, path_str.clone()),
        (ENV_FROM_URI, path_str),
      ]),
    };
    self.run_entry_function(&inv, function, extra).await
  }

  /// Open a package and run one of its exported functions.
  ///
  /// Unless `preserve_files` is set, the extraction directory is removed
  /// afterwards whatever the outcome. A directory that existed beforehand is
  /// only removed once the package was extracted into it.
  pub async fn execute(&self, req: ExecuteRequest) -> Result<()> {
    let name = &req.name;
    let path = match &req.path {
      Some(p) => std::path::absolute(p)?,
      None => self.config.run_dir().join(random_name(10)),
    };
    let existed = tokio::fs::try_exists(&path).await.unwrap_or(true);

    let opened = self.open_package(name, &req, &path).await;
    let extracted = opened.is_ok();
    let ready = opened.and_then(|seal| check_runnable(name, &req.function, seal));
    let result = match &ready {
      Ok(_) => self.run_at(&req.function, &path, req.interactive, &req.env).await,
      Err(_) => Ok(()),
    };

    if !req.preserve_files && (extracted || !existed) {
      match tokio::fs::remove_dir_all(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove run directory"),
      }
    }

    let seal = ready?;
    self.audit.record(&AuditEvent {
      package: &name.to_string(),
      function: &req.function,
      seal: &seal,
      success: result.is_ok(),
    });
    result
  }

  async fn open_package(&self, name: &PackageName, req: &ExecuteRequest, path: &Path) -> Result<Seal> {
    let verifier = self
      .keys
      .verifier(&name.key_scope())?
      .with_digest(self.registry.digest_strategy())
      .require_signature(self.require_signature);

    let seal = self
      .registry
      .open(name, req.credentials.as_ref(), path, &verifier as &dyn VerifyStrategy)
      .await?;
    Ok(seal)
  }
}

/// A package may only run here if it was built for this platform and
/// exports `function`.
fn check_runnable(name: &PackageName, function: &str, seal: Seal) -> Result<Seal> {
  if let Some(current) = Os::current() {
    check_platform(current, &seal.manifest.os)?;
  }
  if seal.manifest.function(function).is_none() {
    return Err(Error::FunctionNotExported {
      package: name.to_string(),
      function: function.to_string(),
    });
  }
  Ok(seal)
}

#[cfg(test)]
mod tests;
