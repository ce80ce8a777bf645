//! Package manifests and seals.
//!
//! A [`Seal`] binds a [`PackageManifest`] to the archive bytes it describes:
//! the digest covers the archive followed by the manifest's JSON encoding, so
//! editing either one afterwards is detected on verification. A seal may also
//! carry a detached ed25519 signature over the same material.

pub mod strategy;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use strategy::{
  AuditEvent, AuditStrategy, DigestStrategy, Ed25519Signer, LogAudit, SealVerifier, Sha256Digest, SignStrategy,
  VerifyStrategy,
};

use crate::manifest::{Function, Input};

#[derive(Debug, Error)]
pub enum SealError {
  #[error("failed to serialize package manifest: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("digest mismatch: expected {expected}, computed {actual}")]
  DigestMismatch { expected: String, actual: String },

  #[error("package is not signed and a signature is required")]
  MissingSignature,

  #[error("signature verification failed: {0}")]
  BadSignature(String),
}

/// Metadata describing a built package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
  #[serde(rename = "type", default)]
  pub kind: String,
  #[serde(default)]
  pub license: String,
  /// Unique package id (`<timestamp>-<short commit>`).
  #[serde(rename = "ref")]
  pub reference: String,
  pub os: String,
  pub profile: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub labels: BTreeMap<String, String>,
  pub source: String,
  pub commit: String,
  #[serde(default)]
  pub branch: String,
  /// Base name of the packaged directory.
  pub target: String,
  /// RFC 3339 creation time.
  pub time: String,
  /// Human readable archive size.
  pub size: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub functions: Vec<FxInfo>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub runtime: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub network: Option<serde_json::Value>,
}

/// An exported function as advertised by a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxInfo {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub input: Option<Input>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub runtime: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub credits: Option<u32>,
}

impl FxInfo {
  /// Describe `function` with its input definitions (values cleared).
  pub fn from_function(function: &Function, input: Option<Input>) -> Self {
    Self {
      name: function.name.clone(),
      description: function.description.clone(),
      input: input.map(|i| i.definitions_only()).filter(|i| !i.is_empty()),
      runtime: function.runtime.clone(),
      credits: function.credits,
    }
  }
}

impl PackageManifest {
  pub fn function(&self, name: &str) -> Option<&FxInfo> {
    self.functions.iter().find(|f| f.name == name)
  }

  pub fn to_json(&self) -> Result<Vec<u8>, SealError> {
    Ok(serde_json::to_vec(self)?)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seal {
  pub manifest: PackageManifest,
  pub digest: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub signature: Option<String>,
}

impl Seal {
  /// Seal `manifest` against `archive`, signing when a signer is given.
  pub fn create(
    manifest: PackageManifest,
    archive: &[u8],
    digest: &dyn DigestStrategy,
    signer: Option<&dyn SignStrategy>,
  ) -> Result<Self, SealError> {
    let manifest_json = manifest.to_json()?;
    let digest_value = digest.digest(archive, &manifest_json);
    let signature = match signer {
      Some(signer) => Some(signer.sign(&signing_material(archive, &manifest_json))?),
      None => None,
    };
    debug!(reference = %manifest.reference, digest = %digest_value, signed = signature.is_some(), "sealed package");

    Ok(Self {
      manifest,
      digest: digest_value,
      signature,
    })
  }

  /// Recompute the digest over `archive` and compare it with the stored one.
  pub fn verify_digest(&self, archive: &[u8], digest: &dyn DigestStrategy) -> Result<(), SealError> {
    let actual = digest.digest(archive, &self.manifest.to_json()?);
    if actual != self.digest {
      return Err(SealError::DigestMismatch {
        expected: self.digest.clone(),
        actual,
      });
    }
    Ok(())
  }

  pub fn is_signed(&self) -> bool {
    self.signature.is_some()
  }

  pub fn to_json_pretty(&self) -> Result<Vec<u8>, SealError> {
    Ok(serde_json::to_vec_pretty(self)?)
  }

  pub fn from_json(bytes: &[u8]) -> Result<Self, SealError> {
    Ok(serde_json::from_slice(bytes)?)
  }
}

/// Bytes covered by both the digest and the signature.
pub(crate) fn signing_material(archive: &[u8], manifest_json: &[u8]) -> Vec<u8> {
  let mut material = Vec::with_capacity(archive.len() + manifest_json.len());
  material.extend_from_slice(archive);
  material.extend_from_slice(manifest_json);
  material
}
