//! Implementation of the `art export` and `art import` commands.

use anyhow::{Context, Result};

use super::{load_config, parse_credentials, parse_name, registry, runtime};
use crate::output::{print_info, print_success};

pub fn cmd_export(names: &[String], dest: &str, credentials: Option<&str>) -> Result<()> {
  let registry = registry(&load_config()?);
  let names = names.iter().map(|n| parse_name(n)).collect::<Result<Vec<_>>>()?;
  let credentials = parse_credentials(credentials)?;

  runtime()?
    .block_on(registry.export(&names, dest, credentials.as_ref()))
    .with_context(|| format!("Failed to export to '{dest}'"))?;

  print_success(&format!("Exported {} package(s)", names.len()));
  Ok(())
}

pub fn cmd_import(uris: &[String], credentials: Option<&str>) -> Result<()> {
  let registry = registry(&load_config()?);
  let credentials = parse_credentials(credentials)?;

  let imported = runtime()?
    .block_on(registry.import(uris, credentials.as_ref()))
    .map_err(artisan_lib::Error::from)
    .context("Import failed")?;

  for name in &imported {
    print_info(&name.to_string());
  }
  print_success(&format!("Imported {} package(s)", imported.len()));
  Ok(())
}
