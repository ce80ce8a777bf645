//! Local package registry.
//!
//! Packages live under a single root directory:
//!
//! ```text
//! registry/
//! ├── index.json     # fully qualified name -> package id
//! ├── <id>.zip       # archive
//! └── <id>.json      # seal
//! ```
//!
//! Archive and seal share the package id so they are always stored and
//! removed together. Several names may point at one id (see
//! [`Registry::tag`]); payload files are deleted once no name references them.
//!
//! The registry takes no locks. Concurrent writes of the same name race and
//! the last writer wins.

pub mod name;
pub mod transport;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use name::PackageName;
pub use transport::Credentials;

use crate::archive::{self, ArchiveError};
use crate::seal::{DigestStrategy, Seal, SealError, Sha256Digest, VerifyStrategy};
use crate::util::fs::atomic_write;

const INDEX_FILE: &str = "index.json";
const EXPORT_INDEX: &str = "repository.json";

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("package '{0}' not found")]
  NotFound(String),

  #[error("invalid package id '{0}'")]
  InvalidId(String),

  #[error("invalid package name '{name}': {reason}")]
  InvalidName { name: String, reason: String },

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

  #[error("unsupported transport '{0}', use a path, file://, http:// or https://")]
  UnsupportedTransport(String),

  #[error("credentials must be given as user:password")]
  InvalidCredentials,

  #[error("transfer to or from '{uri}' failed: {message}")]
  Transfer { uri: String, message: String },

  #[error("corrupt package stream: {0}")]
  Corrupt(String),

  #[error(transparent)]
  Seal(#[from] SealError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error("registry io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("registry index error: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Index {
  #[serde(default)]
  packages: BTreeMap<String, String>,
}

/// A registered package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
  pub name: PackageName,
  pub id: String,
  pub archive: PathBuf,
  pub seal: PathBuf,
}

pub struct Registry {
  root: PathBuf,
  digest: Arc<dyn DigestStrategy>,
  remote: Option<String>,
}

impl std::fmt::Debug for Registry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Registry")
      .field("root", &self.root)
      .field("remote", &self.remote)
      .finish()
  }
}

impl Registry {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      digest: Arc::new(Sha256Digest),
      remote: None,
    }
  }

  pub fn with_digest(mut self, digest: Arc<dyn DigestStrategy>) -> Self {
    self.digest = digest;
    self
  }

  /// Remote consulted by [`Registry::open`] for packages missing locally.
  pub fn with_remote(mut self, remote: Option<String>) -> Self {
    self.remote = remote;
    self
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Digest used to seal and verify packages in this registry.
  pub fn digest_strategy(&self) -> Arc<dyn DigestStrategy> {
    Arc::clone(&self.digest)
  }

  fn archive_path(&self, id: &str) -> PathBuf {
    self.root.join(format!("{id}.zip"))
  }

  fn seal_path(&self, id: &str) -> PathBuf {
    self.root.join(format!("{id}.json"))
  }

  fn load_index(&self) -> Result<Index, RegistryError> {
    match fs::read(self.root.join(INDEX_FILE)) {
      Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Index::default()),
      Err(e) => Err(e.into()),
    }
  }

  fn save_index(&self, index: &Index) -> Result<(), RegistryError> {
    fs::create_dir_all(&self.root)?;
    atomic_write(&self.root.join(INDEX_FILE), &serde_json::to_vec_pretty(index)?)?;
    Ok(())
  }

  fn entry(&self, name: PackageName, id: String) -> Entry {
    Entry {
      archive: self.archive_path(&id),
      seal: self.seal_path(&id),
      name,
      id,
    }
  }

  /// Register the archive at `archive_path` under `name`.
  pub fn add(&self, archive_path: &Path, name: &PackageName, seal: &Seal) -> Result<Entry, RegistryError> {
    let bytes = fs::read(archive_path)?;
    self.add_bytes(&bytes, name, seal)
  }

  /// Register archive `bytes` under `name`, replacing any previous entry.
  pub fn add_bytes(&self, bytes: &[u8], name: &PackageName, seal: &Seal) -> Result<Entry, RegistryError> {
    let id = seal.manifest.reference.clone();
    check_id(&id)?;
    fs::create_dir_all(&self.root)?;

    atomic_write(&self.archive_path(&id), bytes)?;
    atomic_write(&self.seal_path(&id), &seal.to_json_pretty()?)?;

    let mut index = self.load_index()?;
    let previous = index.packages.insert(name.to_string(), id.clone());
    self.save_index(&index)?;

    if let Some(old) = previous.filter(|old| *old != id) {
      self.collect(&index, &old)?;
    }

    info!(package = %name, id = %id, "registered package");
    Ok(self.entry(name.clone(), id))
  }

  pub fn find_by_name(&self, name: &PackageName) -> Result<Entry, RegistryError> {
    let index = self.load_index()?;
    let id = index
      .packages
      .get(&name.to_string())
      .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
    Ok(self.entry(name.clone(), id.clone()))
  }

  pub fn get_seal(&self, entry: &Entry) -> Result<Seal, RegistryError> {
    let bytes = fs::read(&entry.seal)?;
    Ok(Seal::from_json(&bytes)?)
  }

  /// All entries, sorted by fully qualified name.
  pub fn list(&self) -> Result<Vec<Entry>, RegistryError> {
    let index = self.load_index()?;
    let mut entries = Vec::with_capacity(index.packages.len());
    for (name, id) in index.packages {
      match PackageName::parse(&name) {
        Ok(parsed) => entries.push(self.entry(parsed, id)),
        Err(e) => warn!(name = %name, error = %e, "skipping malformed index entry"),
      }
    }
    Ok(entries)
  }

  /// Remove `name`; payload files go once nothing references them.
  pub fn remove(&self, name: &PackageName) -> Result<Entry, RegistryError> {
    let mut index = self.load_index()?;
    let id = index
      .packages
      .remove(&name.to_string())
      .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
    self.save_index(&index)?;
    self.collect(&index, &id)?;
    info!(package = %name, id = %id, "removed package");
    Ok(self.entry(name.clone(), id))
  }

  /// Make `target` refer to the same package as `source`.
  pub fn tag(&self, source: &PackageName, target: &PackageName) -> Result<Entry, RegistryError> {
    let mut index = self.load_index()?;
    let id = index
      .packages
      .get(&source.to_string())
      .cloned()
      .ok_or_else(|| RegistryError::NotFound(source.to_string()))?;
    let previous = index.packages.insert(target.to_string(), id.clone());
    self.save_index(&index)?;
    if let Some(old) = previous.filter(|old| *old != id) {
      self.collect(&index, &old)?;
    }
    info!(source = %source, target = %target, "tagged package");
    Ok(self.entry(target.clone(), id))
  }

  fn collect(&self, index: &Index, id: &str) -> Result<(), RegistryError> {
    if index.packages.values().any(|v| v == id) {
      return Ok(());
    }
    for path in [self.archive_path(id), self.seal_path(id)] {
      match fs::remove_file(&path) {
        Ok(()) => debug!(path = %path.display(), "removed unreferenced payload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
      }
    }
    Ok(())
  }

  /// Verify and extract `name` into `dest`, returning its seal.
  ///
  /// Packages missing locally are pulled from the configured remote first.
  /// Nothing is written to `dest` unless verification succeeds.
  pub async fn open(
    &self,
    name: &PackageName,
    credentials: Option<&Credentials>,
    dest: &Path,
    verifier: &dyn VerifyStrategy,
  ) -> Result<Seal, RegistryError> {
    let entry = match self.find_by_name(name) {
      Ok(entry) => entry,
      Err(RegistryError::NotFound(_)) if self.remote.is_some() => {
        self.pull(name, credentials).await?;
        self.find_by_name(name)?
      }
      Err(e) => return Err(e),
    };

    let seal = self.get_seal(&entry)?;
    let bytes = tokio::fs::read(&entry.archive).await?;

    verifier.verify(&seal, &bytes).map_err(|source| classify(name, source))?;
    debug!(package = %name, digest = %seal.digest, "package verified");

    archive::extract(&bytes, dest)?;
    info!(package = %name, dest = %dest.display(), "opened package");
    Ok(seal)
  }

  async fn pull(&self, name: &PackageName, credentials: Option<&Credentials>) -> Result<(), RegistryError> {
    let Some(remote) = &self.remote else {
      return Err(RegistryError::NotFound(name.to_string()));
    };
    let uri = format!("{}/{}.tar", remote.trim_end_matches('/'), name.file_stem());
    info!(package = %name, "pulling package from remote");
    self.import(&[uri], credentials).await?;
    Ok(())
  }

  /// Write `names` as one tar stream to `dest`.
  pub async fn export(
    &self,
    names: &[PackageName],
    dest: &str,
    credentials: Option<&Credentials>,
  ) -> Result<(), RegistryError> {
    let mut listing = BTreeMap::new();
    let mut ids = BTreeSet::new();
    for name in names {
      let entry = self.find_by_name(name)?;
      listing.insert(name.to_string(), entry.id.clone());
      ids.insert(entry.id);
    }

    let mut builder = tar::Builder::new(Vec::new());
    append(&mut builder, EXPORT_INDEX, &serde_json::to_vec_pretty(&listing)?)?;
    for id in &ids {
      append(&mut builder, &format!("{id}.zip"), &fs::read(self.archive_path(id))?)?;
      append(&mut builder, &format!("{id}.json"), &fs::read(self.seal_path(id))?)?;
    }
    let stream = builder.into_inner()?;

    transport::write(dest, stream, credentials).await?;
    info!(packages = names.len(), dest = %dest, "exported packages");
    Ok(())
  }

  /// Read tar streams from `uris` and register every package they contain.
  ///
  /// Each package's digest is verified before it is registered.
  pub async fn import(
    &self,
    uris: &[String],
    credentials: Option<&Credentials>,
  ) -> Result<Vec<PackageName>, RegistryError> {
    let mut imported = Vec::new();

    for uri in uris {
      let stream = transport::read(uri, credentials).await?;
      let mut files = unpack(&stream)?;

      let listing: BTreeMap<String, String> = match files.remove(EXPORT_INDEX) {
        Some(bytes) => serde_json::from_slice(&bytes)?,
        None => return Err(RegistryError::Corrupt(format!("{uri}: missing {EXPORT_INDEX}"))),
      };

      for (name, id) in listing {
        let name = PackageName::parse(&name)?;
        let missing = |file: String| RegistryError::Corrupt(format!("{uri}: missing {file}"));
        let bytes = files.get(&format!("{id}.zip")).ok_or_else(|| missing(format!("{id}.zip")))?;
        let seal_bytes = files.get(&format!("{id}.json")).ok_or_else(|| missing(format!("{id}.json")))?;
        let seal = Seal::from_json(seal_bytes)?;
        if seal.manifest.reference != id {
          return Err(RegistryError::Corrupt(format!(
            "{uri}: seal of '{name}' names package '{}', listed as '{id}'",
            seal.manifest.reference
          )));
        }

        seal
          .verify_digest(bytes, self.digest.as_ref())
          .map_err(|source| classify(&name, source))?;
        self.add_bytes(bytes, &name, &seal)?;
        imported.push(name);
      }
    }

    info!(packages = imported.len(), "imported packages");
    Ok(imported)
  }
}

/// Package ids become file names, so only `[0-9A-Za-z-]` is allowed.
fn check_id(id: &str) -> Result<(), RegistryError> {
  if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
    return Err(RegistryError::InvalidId(id.to_string()));
  }
  Ok(())
}

fn classify(name: &PackageName, source: SealError) -> RegistryError {
  let name = name.to_string();
  match source {
    SealError::DigestMismatch { .. } | SealError::Serialize(_) => RegistryError::Integrity { name, source },
    SealError::MissingSignature | SealError::BadSignature(_) => RegistryError::Authentication { name, source },
  }
}

fn append(builder: &mut tar::Builder<Vec<u8>>, path: &str, data: &[u8]) -> Result<(), RegistryError> {
  let mut header = tar::Header::new_gnu();
  header.set_size(data.len() as u64);
  header.set_mode(0o644);
  header.set_mtime(0);
  header.set_cksum();
  builder.append_data(&mut header, path, data)?;
  Ok(())
}

fn unpack(stream: &[u8]) -> Result<BTreeMap<String, Vec<u8>>, RegistryError> {
  let mut files = BTreeMap::new();
  let mut archive = tar::Archive::new(Cursor::new(stream));
  for entry in archive.entries()? {
    let mut entry = entry?;
    let path = entry.path()?.to_string_lossy().into_owned();
    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;
    files.insert(path, data);
  }
  Ok(files)
}
