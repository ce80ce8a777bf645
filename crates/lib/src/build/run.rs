//! Profile and function interpretation.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tracing::{debug, info};

use super::{Builder, Invocation};
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::execute::{self, CmdContext, Statement, wait_for_target_until};
use crate::input;
use crate::manifest::Profile;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of running a profile.
pub(crate) struct ProfileOutcome {
  pub profile: Profile,
  /// Resolved target path, present once it exists on disk.
  pub target: Option<PathBuf>,
}

impl Builder {
  fn cmd_context<'a>(&'a self, inv: &'a Invocation<'_>) -> CmdContext<'a> {
    CmdContext {
      work_dir: inv.exec_dir,
      shell: &self.shell,
      interactive: inv.interactive,
    }
  }

  /// Process environment plus injected variables plus `extra`, with the
  /// manifest-level env resolved on top.
  async fn seed_env(&self, inv: &Invocation<'_>, extra: &Environment) -> Result<Environment> {
    let mut env = Environment::from_process();
    env.merge(&inv.injected);
    env.merge(extra);
    execute::resolve_vars(&inv.manifest.env, &mut env, &self.cmd_context(inv)).await?;
    Ok(env)
  }

  pub(crate) async fn run_profile(&self, inv: &Invocation<'_>, name: Option<&str>) -> Result<ProfileOutcome> {
    let ctx = self.cmd_context(inv);
    let mut env = self.seed_env(inv, &Environment::new()).await?;
    let base = env.clone();

    let profile = inv.manifest.select_profile(name)?;
    info!(profile = %profile.name, dir = %inv.exec_dir.display(), "running profile");

    execute::resolve_vars(&profile.env, &mut env, &ctx).await?;
    env.merge(&inv.injected);

    for text in &profile.run {
      self.run_statement(inv, text, &env, &base, 1).await?;
    }

    let target = match profile.target.as_deref().filter(|t| !t.is_empty()) {
      Some(raw) => {
        let resolved = PathBuf::from(env.substitute(raw));
        let path = if resolved.is_absolute() {
          resolved
        } else {
          inv.exec_dir.join(resolved)
        };
        wait_for_target_until(&path, &self.config.wait, &self.cancel).await?;
        Some(path)
      }
      None => None,
    };

    Ok(ProfileOutcome {
      profile: profile.clone(),
      target,
    })
  }

  /// Entry point for `run` and `execute`: seed the environment, then run
  /// `function` at depth one.
  pub(crate) async fn run_entry_function(&self, inv: &Invocation<'_>, function: &str, extra: &Environment) -> Result<()> {
    let env = self.seed_env(inv, extra).await?;
    self.run_function(inv, function, &env, 1).await
  }

  /// Run a function against `base`.
  ///
  /// Functions called from inside this one see the environment as it was
  /// before this function's own env was applied.
  pub(crate) fn run_function<'a>(
    &'a self,
    inv: &'a Invocation<'a>,
    name: &'a str,
    base: &'a Environment,
    depth: usize,
  ) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
      if let Some(max) = self.config.max_call_depth.filter(|max| depth > *max) {
        return Err(Error::CallDepthExceeded {
          function: name.to_string(),
          max,
        });
      }

      let function = inv
        .manifest
        .function(name)
        .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;
      info!(function = %name, depth, "running function");

      let mut env = base.clone();
      if let Some(declared) = inv.manifest.function_input(function) {
        let answers = input::survey(&declared, &env, inv.interactive, self.inputs.as_ref());
        env.merge(&answers);
      }
      let nested = env.clone();

      let local = execute::resolve_vars(&function.env, &mut env, &self.cmd_context(inv)).await?;
      env.merge(&inv.injected);

      for text in &function.run {
        env.merge(&local);
        self.run_statement(inv, text, &env, &nested, depth).await?;
      }
      Ok(())
    })
  }

  async fn run_statement(
    &self,
    inv: &Invocation<'_>,
    text: &str,
    env: &Environment,
    base: &Environment,
    depth: usize,
  ) -> Result<()> {
    let ctx = self.cmd_context(inv);
    match Statement::classify(&env.substitute(text)) {
      Statement::Shell(cmd) => execute::run_cmd(&cmd, env, &ctx).await?,
      Statement::Capture { text, capture } => {
        let cmd = execute::expand_capture(&text, &capture, env, &ctx).await?;
        execute::run_cmd(&cmd, env, &ctx).await?;
      }
      Statement::Call(name) => {
        debug!(function = %name, "calling function");
        self.run_function(inv, &name, base, depth + 1).await?;
      }
    }
    Ok(())
  }
}
