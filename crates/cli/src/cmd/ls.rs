use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use super::{load_config, registry};
use crate::output::{OutputFormat, print_info, print_json, short_digest};

pub fn cmd_ls(output: OutputFormat) -> Result<()> {
  let registry = registry(&load_config()?);
  let entries = registry.list()?;

  let mut rows = Vec::with_capacity(entries.len());
  for entry in &entries {
    rows.push((entry, registry.get_seal(entry)?));
  }

  if output.is_json() {
    let json: Vec<_> = rows
      .iter()
      .map(|(entry, seal)| {
        serde_json::json!({
          "name": entry.name.to_string(),
          "id": entry.id,
          "profile": seal.manifest.profile,
          "digest": seal.digest,
          "size": seal.manifest.size,
          "created": seal.manifest.time,
          "signed": seal.is_signed(),
        })
      })
      .collect();
    return print_json(&json);
  }

  if rows.is_empty() {
    print_info("No packages. Run 'art build' to create one.");
    return Ok(());
  }

  for (entry, seal) in &rows {
    println!(
      "{}  {}  {}  {}  {}",
      entry.name.to_string().if_supports_color(Stream::Stdout, |s| s.cyan()),
      entry.id,
      short_digest(&seal.digest).if_supports_color(Stream::Stdout, |s| s.dimmed()),
      seal.manifest.size,
      seal.manifest.time
    );
  }
  Ok(())
}
