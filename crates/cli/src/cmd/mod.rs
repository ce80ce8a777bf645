mod build;
mod exe;
mod info;
mod keygen;
mod ls;
mod open;
mod rm;
mod run;
mod tag;
mod transfer;

pub use build::{BuildArgs, cmd_build};
pub use exe::{ExeArgs, cmd_exe};
pub use info::cmd_info;
pub use keygen::cmd_keygen;
pub use ls::cmd_ls;
pub use open::cmd_open;
pub use rm::cmd_rm;
pub use run::cmd_run;
pub use tag::cmd_tag;
pub use transfer::{cmd_export, cmd_import};

use std::sync::Arc;

use anyhow::{Context, Result};

use artisan_lib::{Builder, Config, Credentials, Environment, PackageName, Registry};

use crate::prompts::TerminalPrompt;

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}

pub(crate) fn load_config() -> Result<Config> {
  Config::from_env().context("Invalid configuration")
}

pub(crate) fn registry(config: &Config) -> Registry {
  Registry::new(config.registry_dir()).with_remote(config.remote.clone())
}

/// A builder over the configured registry, prompting for inputs when
/// `interactive` is set.
pub(crate) fn builder(interactive: bool) -> Result<Builder> {
  let config = load_config()?;
  let registry = Arc::new(registry(&config));
  let builder = Builder::new(config, registry);
  Ok(if interactive {
    builder.with_input_provider(Box::new(TerminalPrompt::default()))
  } else {
    builder
  })
}

pub(crate) fn parse_name(name: &str) -> Result<PackageName> {
  PackageName::parse(name).with_context(|| format!("Invalid package name '{name}'"))
}

pub(crate) fn parse_credentials(creds: Option<&str>) -> Result<Option<Credentials>> {
  creds
    .map(|c| c.parse::<Credentials>().context("Credentials must be in the form user:password"))
    .transpose()
}

/// Collect `KEY=VALUE` pairs into an environment.
pub(crate) fn env_from_pairs(pairs: &[String]) -> Result<Environment> {
  let mut env = Environment::new();
  for pair in pairs {
    let (key, value) = pair
      .split_once('=')
      .with_context(|| format!("Invalid environment variable '{pair}', expected KEY=VALUE"))?;
    env.insert(key, value);
  }
  Ok(env)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn env_pairs_keep_everything_after_the_first_equals() {
    let env = env_from_pairs(&["A=1".to_string(), "B=x=y".to_string()]).unwrap();
    assert_eq!(env.get("A"), Some("1"));
    assert_eq!(env.get("B"), Some("x=y"));
    assert!(env_from_pairs(&["nope".to_string()]).is_err());
  }

  #[test]
  fn credentials_are_optional() {
    assert!(parse_credentials(None).unwrap().is_none());
    assert_eq!(parse_credentials(Some("u:p")).unwrap().unwrap().user, "u");
    assert!(parse_credentials(Some("bad")).is_err());
  }
}
