use anyhow::{Context, Result};

use super::{load_config, parse_name, registry};
use crate::output::{print_success, symbols};

pub fn cmd_tag(source: &str, target: &str) -> Result<()> {
  let registry = registry(&load_config()?);
  let source = parse_name(source)?;
  let target = parse_name(target)?;

  let entry = registry
    .tag(&source, &target)
    .with_context(|| format!("Failed to tag '{source}'"))?;
  print_success(&format!("{source} {} {target} ({})", symbols::ARROW, entry.id));
  Ok(())
}
