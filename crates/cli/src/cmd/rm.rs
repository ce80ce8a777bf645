use anyhow::{Context, Result};

use super::{load_config, parse_name, registry};
use crate::output::{print_info, print_success};
use crate::prompts::confirm;

pub fn cmd_rm(names: &[String], force: bool) -> Result<()> {
  let registry = registry(&load_config()?);

  let names = names.iter().map(|n| parse_name(n)).collect::<Result<Vec<_>>>()?;
  let listing = names.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
  if !confirm(&format!("Remove {listing}?"), force)? {
    print_info("Nothing removed");
    return Ok(());
  }

  for name in &names {
    let entry = registry.remove(name).with_context(|| format!("Failed to remove '{name}'"))?;
    print_success(&format!("Removed {name} ({})", entry.id));
  }
  Ok(())
}
