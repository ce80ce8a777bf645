//! Pluggable sealing, verification and audit strategies.

use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use tracing::{info, warn};

use super::{Seal, SealError, signing_material};
use crate::util::hash::hash_parts;

/// Computes the content digest of a package.
pub trait DigestStrategy: Send + Sync {
  fn digest(&self, archive: &[u8], manifest_json: &[u8]) -> String;
}

/// `sha256:<hex>` over archive bytes followed by manifest JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl DigestStrategy for Sha256Digest {
  fn digest(&self, archive: &[u8], manifest_json: &[u8]) -> String {
    format!("sha256:{}", hash_parts(&[archive, manifest_json]).0)
  }
}

/// Produces a detached signature over the sealed material.
pub trait SignStrategy: Send + Sync {
  fn sign(&self, material: &[u8]) -> Result<String, SealError>;
}

#[derive(Debug, Clone)]
pub struct Ed25519Signer {
  key: SigningKey,
}

impl Ed25519Signer {
  pub fn new(key: SigningKey) -> Self {
    Self { key }
  }

  pub fn verifying_key(&self) -> VerifyingKey {
    self.key.verifying_key()
  }
}

impl SignStrategy for Ed25519Signer {
  fn sign(&self, material: &[u8]) -> Result<String, SealError> {
    Ok(hex::encode(self.key.sign(material).to_bytes()))
  }
}

/// Checks a seal against archive bytes before anything is extracted.
pub trait VerifyStrategy: Send + Sync {
  fn verify(&self, seal: &Seal, archive: &[u8]) -> Result<(), SealError>;
}

/// Digest check plus optional ed25519 signature check.
pub struct SealVerifier {
  digest: Arc<dyn DigestStrategy>,
  key: Option<VerifyingKey>,
  require_signature: bool,
}

impl Default for SealVerifier {
  fn default() -> Self {
    Self::new(None)
  }
}

impl SealVerifier {
  pub fn new(key: Option<VerifyingKey>) -> Self {
    Self {
      digest: Arc::new(Sha256Digest),
      key,
      require_signature: false,
    }
  }

  pub fn with_digest(mut self, digest: Arc<dyn DigestStrategy>) -> Self {
    self.digest = digest;
    self
  }

  /// Reject packages that carry no signature.
  pub fn require_signature(mut self, require: bool) -> Self {
    self.require_signature = require;
    self
  }
}

impl VerifyStrategy for SealVerifier {
  fn verify(&self, seal: &Seal, archive: &[u8]) -> Result<(), SealError> {
    seal.verify_digest(archive, self.digest.as_ref())?;

    let Some(signature) = &seal.signature else {
      if self.require_signature {
        return Err(SealError::MissingSignature);
      }
      return Ok(());
    };

    let Some(key) = &self.key else {
      if self.require_signature {
        return Err(SealError::BadSignature("no public key available".to_string()));
      }
      warn!(
        reference = %seal.manifest.reference,
        "package is signed but no public key is configured, only the digest was verified"
      );
      return Ok(());
    };

    let bytes = hex::decode(signature).map_err(|e| SealError::BadSignature(e.to_string()))?;
    let signature = Signature::from_slice(&bytes).map_err(|e| SealError::BadSignature(e.to_string()))?;
    let material = signing_material(archive, &seal.manifest.to_json()?);
    key
      .verify(&material, &signature)
      .map_err(|e| SealError::BadSignature(e.to_string()))
  }
}

/// What happened during an `execute`.
#[derive(Debug, Clone, Copy)]
pub struct AuditEvent<'a> {
  pub package: &'a str,
  pub function: &'a str,
  pub seal: &'a Seal,
  pub success: bool,
}

/// Post-run hook invoked after an exported function executes.
pub trait AuditStrategy: Send + Sync {
  fn record(&self, event: &AuditEvent<'_>);
}

/// Records audit events as structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAudit;

impl AuditStrategy for LogAudit {
  fn record(&self, event: &AuditEvent<'_>) {
    info!(
      package = %event.package,
      function = %event.function,
      reference = %event.seal.manifest.reference,
      digest = %event.seal.digest,
      success = event.success,
      "function executed"
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seal::tests::sample_manifest;

  fn key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
  }

  #[test]
  fn sha256_digest_is_prefixed_hex() {
    let d = Sha256Digest.digest(b"a", b"b");
    assert_eq!(d.len(), "sha256:".len() + 64);
    assert_eq!(d, Sha256Digest.digest(b"ab", b""));
  }

  #[test]
  fn signed_seal_verifies_with_matching_key() {
    let signer = Ed25519Signer::new(key(7));
    let seal = Seal::create(sample_manifest(), b"zip", &Sha256Digest, Some(&signer)).unwrap();

    SealVerifier::new(Some(signer.verifying_key()))
      .require_signature(true)
      .verify(&seal, b"zip")
      .unwrap();
  }

  #[test]
  fn wrong_key_fails_authentication() {
    let seal = Seal::create(sample_manifest(), b"zip", &Sha256Digest, Some(&Ed25519Signer::new(key(1)))).unwrap();
    let other = key(2).verifying_key();

    let err = SealVerifier::new(Some(other)).verify(&seal, b"zip").unwrap_err();
    assert!(matches!(err, SealError::BadSignature(_)));
  }

  #[test]
  fn tampered_archive_fails_digest_before_signature() {
    let signer = Ed25519Signer::new(key(3));
    let seal = Seal::create(sample_manifest(), b"zip", &Sha256Digest, Some(&signer)).unwrap();

    let err = SealVerifier::new(Some(signer.verifying_key()))
      .verify(&seal, b"zap")
      .unwrap_err();
    assert!(matches!(err, SealError::DigestMismatch { .. }));
  }

  #[test]
  #[tracing_test::traced_test]
  fn signed_seal_without_key_warns_and_passes() {
    let seal = Seal::create(sample_manifest(), b"zip", &Sha256Digest, Some(&Ed25519Signer::new(key(4)))).unwrap();
    SealVerifier::default().verify(&seal, b"zip").unwrap();
    assert!(logs_contain("only the digest was verified"));
  }

  #[test]
  fn unsigned_seal_rejected_when_signature_required() {
    let seal = Seal::create(sample_manifest(), b"zip", &Sha256Digest, None).unwrap();
    let err = SealVerifier::default()
      .require_signature(true)
      .verify(&seal, b"zip")
      .unwrap_err();
    assert!(matches!(err, SealError::MissingSignature));
  }
}
