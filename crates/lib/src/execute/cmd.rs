//! Shell command execution.
//!
//! Statements run through the platform shell with the invocation's
//! [`Environment`] as the complete process environment. Output of plain
//! statements streams to the terminal; captures collect stdout.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use super::ExecuteError;
use crate::env::Environment;

/// Shell program plus the arguments that precede the command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
  pub program: String,
  pub args: Vec<String>,
}

impl Default for Shell {
  fn default() -> Self {
    Self::resolve(None)
  }
}

impl Shell {
  /// Resolve the shell, honoring an explicit override.
  ///
  /// The user's `$SHELL` is never consulted; login shells may source
  /// profiles that alter the environment.
  pub fn resolve(override_shell: Option<&str>) -> Self {
    if let Some(shell) = override_shell {
      let args = if shell.contains("powershell") || shell.contains("pwsh") {
        vec!["-NoProfile".to_string(), "-Command".to_string()]
      } else if shell.ends_with("cmd") || shell.ends_with("cmd.exe") {
        vec!["/C".to_string()]
      } else {
        vec!["-c".to_string()]
      };
      return Self {
        program: shell.to_string(),
        args,
      };
    }

    #[cfg(unix)]
    {
      Self {
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string()],
      }
    }

    #[cfg(windows)]
    {
      Self {
        program: "powershell.exe".to_string(),
        args: vec![
          "-NoProfile".to_string(),
          "-ExecutionPolicy".to_string(),
          "Bypass".to_string(),
          "-Command".to_string(),
        ],
      }
    }
  }
}

/// Where and how a statement runs.
#[derive(Debug, Clone, Copy)]
pub struct CmdContext<'a> {
  pub work_dir: &'a Path,
  pub shell: &'a Shell,
  /// When false, stdin is closed so nothing can block on a prompt.
  pub interactive: bool,
}

fn command(cmd: &str, env: &Environment, ctx: &CmdContext<'_>) -> Command {
  let mut command = Command::new(&ctx.shell.program);
  command
    .args(&ctx.shell.args)
    .arg(cmd)
    .current_dir(ctx.work_dir)
    .env_clear()
    .envs(env.iter())
    .stdin(if ctx.interactive { Stdio::inherit() } else { Stdio::null() });
  command
}

/// Run `cmd`, streaming its output. Fails on a non-zero exit.
pub async fn run_cmd(cmd: &str, env: &Environment, ctx: &CmdContext<'_>) -> Result<(), ExecuteError> {
  info!(cmd = %cmd, "executing statement");
  debug!(shell = %ctx.shell.program, work_dir = %ctx.work_dir.display(), "spawning process");

  let status = command(cmd, env, ctx)
    .stdout(Stdio::inherit())
    .stderr(Stdio::inherit())
    .status()
    .await
    .map_err(|source| ExecuteError::Spawn {
      cmd: cmd.to_string(),
      source,
    })?;

  if !status.success() {
    return Err(ExecuteError::CmdFailed {
      cmd: cmd.to_string(),
      code: status.code(),
    });
  }
  Ok(())
}

/// Run `cmd` and return its stdout with one trailing newline removed.
pub async fn capture_cmd(cmd: &str, env: &Environment, ctx: &CmdContext<'_>) -> Result<String, ExecuteError> {
  debug!(cmd = %cmd, work_dir = %ctx.work_dir.display(), "capturing command output");

  let output = command(cmd, env, ctx)
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .output()
    .await
    .map_err(|source| ExecuteError::Spawn {
      cmd: cmd.to_string(),
      source,
    })?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    return Err(ExecuteError::CmdFailed {
      cmd: cmd.to_string(),
      code: output.status.code(),
    });
  }

  let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
  if stdout.ends_with('\n') {
    stdout.pop();
    if stdout.ends_with('\r') {
      stdout.pop();
    }
  }
  debug!(stdout = %stdout, "captured output");
  Ok(stdout)
}
