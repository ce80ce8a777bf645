//! Implementation of the `art open` command.
//!
//! Verifies a package and extracts its files without running anything.

use std::path::Path;

use anyhow::{Context, Result};

use artisan_lib::keys::KeyStore;

use super::{load_config, parse_credentials, parse_name, registry, runtime};
use crate::output::{print_stat, print_success, print_warning, short_digest};

pub fn cmd_open(name: &str, dest: &Path, credentials: Option<&str>, require_signature: bool) -> Result<()> {
  let config = load_config()?;
  let registry = registry(&config);
  let name = parse_name(name)?;
  let credentials = parse_credentials(credentials)?;

  let verifier = KeyStore::new(config.keys_dir())
    .verifier(&name.key_scope())?
    .with_digest(registry.digest_strategy())
    .require_signature(require_signature);

  let seal = runtime()?
    .block_on(registry.open(&name, credentials.as_ref(), dest, &verifier))
    .map_err(artisan_lib::Error::from)
    .with_context(|| format!("Failed to open '{name}'"))?;

  print_success(&format!("Opened {name} into {}", dest.display()));
  print_stat("Digest", short_digest(&seal.digest));
  if !seal.is_signed() {
    print_warning("Package is not signed, only its digest was verified");
  }
  Ok(())
}
