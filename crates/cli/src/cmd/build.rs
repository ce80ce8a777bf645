//! Implementation of the `art build` command.
//!
//! Builds a package from a local path or a git URL, seals it and registers it
//! in the local registry.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use artisan_lib::{BuildRequest, SourceRequest};

use super::{builder, parse_name, runtime};
use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success, short_digest};

pub struct BuildArgs {
  pub from: String,
  pub name: String,
  pub profile: Option<String>,
  pub sub_path: Option<String>,
  pub token: Option<String>,
  pub copy: bool,
  pub target: Option<String>,
  pub interactive: bool,
}

pub fn cmd_build(args: BuildArgs, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let name = parse_name(&args.name)?;
  let builder = builder(args.interactive)?;

  let request = BuildRequest {
    source: SourceRequest {
      from: args.from,
      sub_path: args.sub_path,
      token: args.token,
      copy: args.copy,
      target: args.target,
    },
    name: name.clone(),
    profile: args.profile,
    interactive: args.interactive,
  };

  let rt = runtime()?;
  let outcome = rt
    .block_on(async {
      // interrupting stops the wait for the build target
      let cancel = builder.cancellation_token();
      tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          cancel.cancel();
        }
      });
      builder.build(request).await
    })
    .with_context(|| format!("Failed to build '{name}'"))?;
  info!(id = %outcome.entry.id, "build finished");

  if output.is_json() {
    print_json(&outcome.seal)?;
  } else {
    print_success(&format!("Built {name}"));
    print_stat("Id", &outcome.entry.id);
    print_stat("Profile", &outcome.seal.manifest.profile);
    print_stat("Digest", short_digest(&outcome.seal.digest));
    print_stat("Signed", if outcome.seal.is_signed() { "yes" } else { "no" });
    print_stat("Size", &outcome.seal.manifest.size);
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}
