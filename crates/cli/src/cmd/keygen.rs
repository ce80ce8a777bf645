use anyhow::{Result, bail};

use artisan_lib::keys::{KeyScope, KeyStore};

use super::load_config;
use crate::output::{print_stat, print_success};

/// Generate a signing key pair for the root, a group, or a single package.
pub fn cmd_keygen(group: Option<String>, name: Option<String>, force: bool) -> Result<()> {
  let scope = match (group, name) {
    (None, None) => KeyScope::Root,
    (Some(group), None) => KeyScope::Group(group),
    (Some(group), Some(name)) => KeyScope::Package { group, name },
    (None, Some(_)) => bail!("--name requires --group"),
  };

  let store = KeyStore::new(load_config()?.keys_dir());
  let paths = store.generate(&scope, force)?;

  print_success("Generated signing key pair");
  print_stat("Private", &paths.private.display().to_string());
  print_stat("Public", &paths.public.display().to_string());
  Ok(())
}
