//! Project manifest loading and validation.
//!
//! A manifest is read from `build.yaml` in the load directory, validated once,
//! and never mutated afterwards.

mod types;

pub use types::*;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::BUILD_FILE;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid manifest: {0}")]
  Invalid(String),

  #[error("profile '{0}' not found in manifest")]
  ProfileNotFound(String),

  #[error("manifest declares no profiles")]
  NoProfiles,
}

impl Manifest {
  /// Load and validate `build.yaml` from `dir`.
  pub fn load(dir: &Path) -> Result<Self, ManifestError> {
    let path = dir.join(BUILD_FILE);
    let content = std::fs::read_to_string(&path).map_err(|source| ManifestError::Read {
      path: path.clone(),
      source,
    })?;
    let manifest = Self::parse(&content).map_err(|e| match e {
      ManifestError::Parse { source, .. } => ManifestError::Parse { path: path.clone(), source },
      other => other,
    })?;
    debug!(
      path = %path.display(),
      profiles = manifest.profiles.len(),
      functions = manifest.functions.len(),
      "loaded manifest"
    );
    Ok(manifest)
  }

  /// Load the manifest from `dir` if one exists.
  pub fn load_optional(dir: &Path) -> Result<Option<Self>, ManifestError> {
    if dir.join(BUILD_FILE).is_file() {
      Self::load(dir).map(Some)
    } else {
      Ok(None)
    }
  }

  /// Parse and validate manifest text.
  pub fn parse(content: &str) -> Result<Self, ManifestError> {
    let manifest: Manifest = serde_yaml::from_str(content).map_err(|source| ManifestError::Parse {
      path: PathBuf::from(BUILD_FILE),
      source,
    })?;
    manifest.validate()?;
    Ok(manifest)
  }

  pub fn validate(&self) -> Result<(), ManifestError> {
    if self.profiles.is_empty() && self.functions.is_empty() {
      return Err(ManifestError::Invalid(
        "at least one profile or function must be declared".to_string(),
      ));
    }

    let mut seen = HashSet::new();
    for p in &self.profiles {
      if p.name.is_empty() {
        return Err(ManifestError::Invalid("profile with empty name".to_string()));
      }
      if !seen.insert(p.name.as_str()) {
        return Err(ManifestError::Invalid(format!("duplicate profile '{}'", p.name)));
      }
    }

    let defaults = self.profiles.iter().filter(|p| p.default).count();
    if defaults > 1 {
      return Err(ManifestError::Invalid(format!(
        "{defaults} profiles are flagged default, at most one is allowed"
      )));
    }

    let mut seen = HashSet::new();
    for f in &self.functions {
      if f.name.is_empty() {
        return Err(ManifestError::Invalid("function with empty name".to_string()));
      }
      if !seen.insert(f.name.as_str()) {
        return Err(ManifestError::Invalid(format!("duplicate function '{}'", f.name)));
      }
      if let Some(binding) = &f.input {
        self.check_binding(&f.name, binding)?;
      }
    }

    Ok(())
  }

  fn check_binding(&self, function: &str, binding: &InputBinding) -> Result<(), ManifestError> {
    let declared = self.input.clone().unwrap_or_default();
    let undeclared = |kind: &str, name: &str| {
      ManifestError::Invalid(format!(
        "function '{function}' binds {kind} '{name}' which is not declared in input"
      ))
    };

    if let Some(name) = binding.var.iter().find(|n| !declared.contains_var(n)) {
      return Err(undeclared("var", name));
    }
    if let Some(name) = binding.secret.iter().find(|n| !declared.contains_secret(n)) {
      return Err(undeclared("secret", name));
    }
    if let Some(name) = binding.key.iter().find(|n| !declared.contains_key(n)) {
      return Err(undeclared("key", name));
    }
    Ok(())
  }

  /// Select a profile: exact name if given, else the default, else the first.
  pub fn select_profile(&self, name: Option<&str>) -> Result<&Profile, ManifestError> {
    match name {
      Some(name) => self
        .profile(name)
        .ok_or_else(|| ManifestError::ProfileNotFound(name.to_string())),
      None => self
        .default_profile()
        .or_else(|| self.profiles.first())
        .ok_or(ManifestError::NoProfiles),
    }
  }

  /// Resolve the input definitions a function binds to.
  ///
  /// Returns `None` when the function declares no bindings.
  pub fn function_input(&self, function: &Function) -> Option<Input> {
    let binding = function.input.as_ref()?;
    let declared = self.input.as_ref()?;

    let input = Input {
      var: declared
        .var
        .iter()
        .filter(|v| binding.var.contains(&v.name))
        .cloned()
        .collect(),
      secret: declared
        .secret
        .iter()
        .filter(|s| binding.secret.contains(&s.name))
        .cloned()
        .collect(),
      key: declared
        .key
        .iter()
        .filter(|k| binding.key.contains(&k.name))
        .cloned()
        .collect(),
    };
    Some(input)
  }
}
