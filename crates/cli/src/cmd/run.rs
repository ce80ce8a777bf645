//! Implementation of the `art run` command.

use anyhow::{Context, Result};

use super::{builder, env_from_pairs, runtime};
use crate::output::print_success;

/// Run `function` from the manifest in `path` (current directory by default).
pub fn cmd_run(function: &str, path: Option<&str>, interactive: bool, env: &[String]) -> Result<()> {
  let env = env_from_pairs(env)?;
  let builder = builder(interactive)?;

  runtime()?
    .block_on(builder.run(function, path, interactive, &env))
    .with_context(|| format!("Function '{function}' failed"))?;

  print_success(&format!("Ran {function}"));
  Ok(())
}
