//! Runtime configuration.
//!
//! A [`Config`] is built once (usually from the process environment) and
//! handed to the registry, key store and builder. Nothing reads configuration
//! from globals after construction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::platform::paths::artisan_home;

pub const ENV_HOME: &str = "ARTISAN_HOME";
pub const ENV_SHELL: &str = "ARTISAN_SHELL";
pub const ENV_WAIT_INTERVAL_MS: &str = "ARTISAN_WAIT_INTERVAL_MS";
pub const ENV_WAIT_ATTEMPTS: &str = "ARTISAN_WAIT_ATTEMPTS";
pub const ENV_MAX_CALL_DEPTH: &str = "ARTISAN_MAX_CALL_DEPTH";
pub const ENV_REMOTE: &str = "ARTISAN_REMOTE";

const DEFAULT_WAIT_INTERVAL_MS: u64 = 500;
const DEFAULT_WAIT_ATTEMPTS: u32 = 120;
const DEFAULT_MAX_CALL_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("invalid value '{value}' for {var}")]
  Invalid { var: String, value: String },
}

/// Bounded polling policy for target materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
  pub interval: Duration,
  pub max_attempts: u32,
}

impl Default for WaitPolicy {
  fn default() -> Self {
    Self {
      interval: Duration::from_millis(DEFAULT_WAIT_INTERVAL_MS),
      max_attempts: DEFAULT_WAIT_ATTEMPTS,
    }
  }
}

impl WaitPolicy {
  /// Upper bound on the time spent waiting.
  pub fn timeout(&self) -> Duration {
    self.interval * self.max_attempts
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub home: PathBuf,
  pub shell: Option<String>,
  pub wait: WaitPolicy,
  /// `None` disables the nested call guard.
  pub max_call_depth: Option<usize>,
  pub remote: Option<String>,
}

impl Config {
  /// Configuration rooted at `home` with defaults for everything else.
  pub fn with_home(home: impl Into<PathBuf>) -> Self {
    Self {
      home: home.into(),
      shell: None,
      wait: WaitPolicy::default(),
      max_call_depth: Some(DEFAULT_MAX_CALL_DEPTH),
      remote: None,
    }
  }

  /// Read configuration from `ARTISAN_*` environment variables.
  pub fn from_env() -> Result<Self, ConfigError> {
    let mut config = Self::with_home(artisan_home());
    config.shell = non_empty_var(ENV_SHELL);
    config.remote = non_empty_var(ENV_REMOTE);

    if let Some(ms) = parse_var::<u64>(ENV_WAIT_INTERVAL_MS)? {
      config.wait.interval = Duration::from_millis(ms);
    }
    if let Some(attempts) = parse_var::<u32>(ENV_WAIT_ATTEMPTS)? {
      config.wait.max_attempts = attempts;
    }
    if let Some(depth) = parse_var::<usize>(ENV_MAX_CALL_DEPTH)? {
      config.max_call_depth = (depth > 0).then_some(depth);
    }

    Ok(config)
  }

  pub fn registry_dir(&self) -> PathBuf {
    self.home.join("registry")
  }

  pub fn build_dir(&self) -> PathBuf {
    self.home.join("build")
  }

  pub fn run_dir(&self) -> PathBuf {
    self.home.join("run")
  }

  pub fn keys_dir(&self) -> PathBuf {
    self.home.join("keys")
  }

  pub fn home(&self) -> &Path {
    &self.home
  }
}

fn non_empty_var(var: &str) -> Option<String> {
  std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
  match non_empty_var(var) {
    None => Ok(None),
    Some(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
      var: var.to_string(),
      value,
    }),
  }
}
