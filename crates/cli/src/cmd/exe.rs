//! Implementation of the `art exe` command.
//!
//! Opens a sealed package, checks it may run here, and executes one of its
//! exported functions.

use std::path::PathBuf;

use anyhow::{Context, Result};

use artisan_lib::ExecuteRequest;

use super::{builder, env_from_pairs, parse_credentials, parse_name, runtime};
use crate::output::print_success;

pub struct ExeArgs {
  pub name: String,
  pub function: String,
  pub credentials: Option<String>,
  pub interactive: bool,
  pub path: Option<PathBuf>,
  pub preserve_files: bool,
  pub require_signature: bool,
  pub env: Vec<String>,
}

pub fn cmd_exe(args: ExeArgs) -> Result<()> {
  let name = parse_name(&args.name)?;
  let builder = builder(args.interactive)?.require_signature(args.require_signature);

  let request = ExecuteRequest {
    name: name.clone(),
    function: args.function.clone(),
    credentials: parse_credentials(args.credentials.as_deref())?,
    interactive: args.interactive,
    path: args.path,
    preserve_files: args.preserve_files,
    env: env_from_pairs(&args.env)?,
  };

  runtime()?
    .block_on(builder.execute(request))
    .with_context(|| format!("Failed to execute '{}' from '{name}'", args.function))?;

  print_success(&format!("Executed {} from {name}", args.function));
  Ok(())
}
