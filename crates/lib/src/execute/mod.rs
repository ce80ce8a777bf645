//! Statement execution.
//!
//! Run statements are classified once into a [`Statement`] and dispatched by
//! the builder. This module owns the pieces that do not need the manifest:
//! shell execution, subshell capture and variable table resolution.

pub mod cmd;
pub mod wait;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

pub use cmd::{CmdContext, Shell, capture_cmd, run_cmd};
pub use wait::{WaitError, wait_for_target, wait_for_target_until};

use crate::env::Environment;
use crate::placeholder::{self, Capture};

#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  #[error("failed to spawn '{cmd}': {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },
}

/// A run statement after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
  /// Plain shell text.
  Shell(String),
  /// Shell text with an embedded `$((command))` to run first.
  Capture { text: String, capture: Capture },
  /// A bare `$(function)` call.
  Call(String),
}

impl Statement {
  pub fn classify(text: &str) -> Self {
    if let Some(name) = placeholder::function_call(text) {
      return Self::Call(name.to_string());
    }
    match placeholder::find_capture(text) {
      Some(capture) => Self::Capture {
        text: text.to_string(),
        capture,
      },
      None => Self::Shell(text.to_string()),
    }
  }
}

/// Substitute `${NAME}` references, then resolve one subshell capture.
///
/// Text without a capture marker comes back with only variable substitution
/// applied.
pub async fn resolve_subshell(
  text: &str,
  env: &Environment,
  ctx: &CmdContext<'_>,
) -> Result<String, ExecuteError> {
  let text = env.substitute(text);
  match placeholder::find_capture(&text) {
    Some(capture) => expand_capture(&text, &capture, env, ctx).await,
    None => Ok(text),
  }
}

/// Run `capture.command` and splice its output into `text`.
pub async fn expand_capture(
  text: &str,
  capture: &Capture,
  env: &Environment,
  ctx: &CmdContext<'_>,
) -> Result<String, ExecuteError> {
  let output = capture_cmd(&capture.command, env, ctx).await?;
  Ok(text.replacen(&capture.expr, &output, 1))
}

/// Resolve a variable table in declaration order.
///
/// Each resolved value is written into `env` before the next one is
/// processed, so later entries may refer to earlier siblings. Returns the
/// resolved table.
pub async fn resolve_vars(
  vars: &IndexMap<String, String>,
  env: &mut Environment,
  ctx: &CmdContext<'_>,
) -> Result<Environment, ExecuteError> {
  let mut resolved = Environment::new();
  for (name, raw) in vars {
    let value = resolve_subshell(raw, env, ctx).await?;
    debug!(var = %name, "resolved variable");
    env.insert(name.clone(), value.clone());
    resolved.insert(name.clone(), value);
  }
  Ok(resolved)
}
