//! Ed25519 key store.
//!
//! Keys are PKCS#8 (private) and SPKI (public) PEM files named
//! `<prefix>_sk.pem` and `<prefix>_pk.pem`. A key can be scoped to the whole
//! store, to a package group, or to one package:
//!
//! ```text
//! keys/
//! ├── root_sk.pem
//! ├── root_pk.pem
//! └── <group>/
//!     ├── <group>_pk.pem
//!     └── <name>/
//!         └── <name>_pk.pem
//! ```
//!
//! Lookups for `group/name` try the package scope, then the group, then the
//! root, and return the first key of the requested role.

use std::fs;
use std::path::{Path, PathBuf};

use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use thiserror::Error;
use tracing::{debug, info};

use crate::seal::{Ed25519Signer, SealVerifier};

const ROOT_PREFIX: &str = "root";

#[derive(Debug, Error)]
pub enum KeyError {
  #[error("key already exists at {0}")]
  AlreadyExists(PathBuf),

  #[error("invalid key file {path}: {message}")]
  Invalid { path: PathBuf, message: String },

  #[error("failed to encode key: {0}")]
  Encode(String),

  #[error("key store io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Where a key applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyScope {
  Root,
  Group(String),
  Package { group: String, name: String },
}

impl KeyScope {
  fn dir(&self, root: &Path) -> PathBuf {
    match self {
      Self::Root => root.to_path_buf(),
      Self::Group(group) => root.join(group),
      Self::Package { group, name } => root.join(group).join(name),
    }
  }

  fn prefix(&self) -> &str {
    match self {
      Self::Root => ROOT_PREFIX,
      Self::Group(group) => group,
      Self::Package { name, .. } => name,
    }
  }

  /// The scope itself followed by its broader parents.
  fn search_order(&self) -> Vec<KeyScope> {
    match self {
      Self::Root => vec![Self::Root],
      Self::Group(group) => vec![Self::Group(group.clone()), Self::Root],
      Self::Package { group, name } => vec![
        Self::Package {
          group: group.clone(),
          name: name.clone(),
        },
        Self::Group(group.clone()),
        Self::Root,
      ],
    }
  }
}

/// Paths of a freshly generated key pair.
#[derive(Debug, Clone)]
pub struct KeyPairPaths {
  pub private: PathBuf,
  pub public: PathBuf,
}

#[derive(Debug, Clone)]
pub struct KeyStore {
  root: PathBuf,
}

impl KeyStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn private_key_path(&self, scope: &KeyScope) -> PathBuf {
    scope.dir(&self.root).join(format!("{}_sk.pem", scope.prefix()))
  }

  pub fn public_key_path(&self, scope: &KeyScope) -> PathBuf {
    scope.dir(&self.root).join(format!("{}_pk.pem", scope.prefix()))
  }

  /// Generate and store a key pair for `scope`.
  pub fn generate(&self, scope: &KeyScope, force: bool) -> Result<KeyPairPaths, KeyError> {
    let private = self.private_key_path(scope);
    let public = self.public_key_path(scope);
    if !force {
      for path in [&private, &public] {
        if path.exists() {
          return Err(KeyError::AlreadyExists(path.clone()));
        }
      }
    }

    let signing = SigningKey::generate(&mut rand::thread_rng());
    let private_pem = signing
      .to_pkcs8_pem(LineEnding::LF)
      .map_err(|e| KeyError::Encode(e.to_string()))?;
    let public_pem = signing
      .verifying_key()
      .to_public_key_pem(LineEnding::LF)
      .map_err(|e| KeyError::Encode(e.to_string()))?;

    if let Some(dir) = private.parent() {
      fs::create_dir_all(dir)?;
    }
    fs::write(&private, private_pem.as_bytes())?;
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      fs::set_permissions(&private, fs::Permissions::from_mode(0o600))?;
    }
    fs::write(&public, public_pem)?;

    info!(private = %private.display(), public = %public.display(), "generated key pair");
    Ok(KeyPairPaths { private, public })
  }

  /// Find the signing key for `scope`, falling back to broader scopes.
  pub fn signing_key(&self, scope: &KeyScope) -> Result<Option<SigningKey>, KeyError> {
    for candidate in scope.search_order() {
      let path = self.private_key_path(&candidate);
      if path.is_file() {
        let pem = fs::read_to_string(&path)?;
        let key = SigningKey::from_pkcs8_pem(&pem).map_err(|e| KeyError::Invalid {
          path: path.clone(),
          message: e.to_string(),
        })?;
        debug!(path = %path.display(), "using signing key");
        return Ok(Some(key));
      }
    }
    Ok(None)
  }

  /// Find the verification key for `scope`, falling back to broader scopes.
  pub fn verifying_key(&self, scope: &KeyScope) -> Result<Option<VerifyingKey>, KeyError> {
    for candidate in scope.search_order() {
      let path = self.public_key_path(&candidate);
      if path.is_file() {
        let pem = fs::read_to_string(&path)?;
        let key = VerifyingKey::from_public_key_pem(&pem).map_err(|e| KeyError::Invalid {
          path: path.clone(),
          message: e.to_string(),
        })?;
        debug!(path = %path.display(), "using verification key");
        return Ok(Some(key));
      }
    }
    Ok(None)
  }

  pub fn signer(&self, scope: &KeyScope) -> Result<Option<Ed25519Signer>, KeyError> {
    Ok(self.signing_key(scope)?.map(Ed25519Signer::new))
  }

  pub fn verifier(&self, scope: &KeyScope) -> Result<SealVerifier, KeyError> {
    Ok(SealVerifier::new(self.verifying_key(scope)?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn package(group: &str, name: &str) -> KeyScope {
    KeyScope::Package {
      group: group.to_string(),
      name: name.to_string(),
    }
  }

  #[test]
  fn generate_writes_pem_pair() {
    let dir = TempDir::new().unwrap();
    let store = KeyStore::new(dir.path());

    let paths = store.generate(&KeyScope::Root, false).unwrap();
    assert!(paths.private.ends_with("root_sk.pem"));
    assert!(paths.public.ends_with("root_pk.pem"));
    assert!(fs::read_to_string(&paths.private).unwrap().contains("BEGIN PRIVATE KEY"));
    assert!(fs::read_to_string(&paths.public).unwrap().contains("BEGIN PUBLIC KEY"));
  }

  #[test]
  fn generate_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    let store = KeyStore::new(dir.path());
    store.generate(&KeyScope::Root, false).unwrap();

    assert!(matches!(
      store.generate(&KeyScope::Root, false),
      Err(KeyError::AlreadyExists(_))
    ));
    store.generate(&KeyScope::Root, true).unwrap();
  }

  #[test]
  fn loaded_keys_form_a_pair() {
    let dir = TempDir::new().unwrap();
    let store = KeyStore::new(dir.path());
    store.generate(&KeyScope::Group("acme".to_string()), false).unwrap();

    let scope = KeyScope::Group("acme".to_string());
    let signing = store.signing_key(&scope).unwrap().unwrap();
    let verifying = store.verifying_key(&scope).unwrap().unwrap();
    assert_eq!(signing.verifying_key(), verifying);
  }

  #[test]
  fn lookup_prefers_narrowest_scope() {
    let dir = TempDir::new().unwrap();
    let store = KeyStore::new(dir.path());
    store.generate(&KeyScope::Root, false).unwrap();
    store.generate(&package("acme", "web"), false).unwrap();

    let root = store.verifying_key(&KeyScope::Root).unwrap().unwrap();
    let web = store.verifying_key(&package("acme", "web")).unwrap().unwrap();
    let api = store.verifying_key(&package("acme", "api")).unwrap().unwrap();

    assert_ne!(web, root);
    assert_eq!(api, root, "packages without their own key fall back to root");
  }

  #[test]
  fn empty_store_has_no_keys() {
    let dir = TempDir::new().unwrap();
    let store = KeyStore::new(dir.path());
    assert!(store.signer(&package("a", "b")).unwrap().is_none());
    assert!(store.verifying_key(&KeyScope::Root).unwrap().is_none());
  }

  #[test]
  fn corrupt_key_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = KeyStore::new(dir.path());
    fs::write(store.public_key_path(&KeyScope::Root), "garbage").unwrap();

    assert!(matches!(
      store.verifying_key(&KeyScope::Root),
      Err(KeyError::Invalid { .. })
    ));
  }
}
