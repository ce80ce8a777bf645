//! Input surveying for function invocations.
//!
//! A function's bound inputs are resolved from, in order: the current
//! environment, the declared default, the [`InputProvider`] (interactive
//! invocations only), and finally the empty string. Non-interactive runs
//! never block waiting for a value.

use tracing::{debug, warn};

use crate::env::Environment;
use crate::manifest::{Input, Key, Secret, Var};

/// Supplies values for inputs that could not be resolved otherwise.
pub trait InputProvider: Send + Sync {
  fn var(&self, var: &Var) -> Option<String>;
  fn secret(&self, secret: &Secret) -> Option<String>;
  fn key(&self, key: &Key) -> Option<String>;
}

/// Provider that never supplies anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl InputProvider for NonInteractive {
  fn var(&self, _: &Var) -> Option<String> {
    None
  }

  fn secret(&self, _: &Secret) -> Option<String> {
    None
  }

  fn key(&self, _: &Key) -> Option<String> {
    None
  }
}

/// Resolve every input in `input` and return them as environment entries.
pub fn survey(
  input: &Input,
  env: &Environment,
  interactive: bool,
  provider: &dyn InputProvider,
) -> Environment {
  let mut out = Environment::new();

  for var in &input.var {
    let value = lookup(env, &var.name)
      .or_else(|| var.default.clone())
      .or_else(|| interactive.then(|| provider.var(var)).flatten());
    out.insert(var.name.clone(), finish(&var.name, var.required, value));
  }

  for secret in &input.secret {
    let value = lookup(env, &secret.name).or_else(|| interactive.then(|| provider.secret(secret)).flatten());
    out.insert(secret.name.clone(), finish(&secret.name, secret.required, value));
  }

  for key in &input.key {
    let value = lookup(env, &key.name).or_else(|| interactive.then(|| provider.key(key)).flatten());
    out.insert(key.name.clone(), finish(&key.name, false, value));
  }

  out
}

fn lookup(env: &Environment, name: &str) -> Option<String> {
  env.get(name).filter(|v| !v.is_empty()).map(str::to_string)
}

fn finish(name: &str, required: bool, value: Option<String>) -> String {
  match value {
    Some(v) => {
      debug!(input = %name, "input resolved");
      v
    }
    None => {
      if required {
        warn!(input = %name, "required input has no value, using empty string");
      }
      String::new()
    }
  }
}

impl Input {
  /// Copy of the definitions with every value cleared.
  pub fn definitions_only(&self) -> Input {
    Input {
      var: self
        .var
        .iter()
        .map(|v| Var {
          value: String::new(),
          ..v.clone()
        })
        .collect(),
      secret: self
        .secret
        .iter()
        .map(|s| Secret {
          value: String::new(),
          ..s.clone()
        })
        .collect(),
      key: self
        .key
        .iter()
        .map(|k| Key {
          value: String::new(),
          ..k.clone()
        })
        .collect(),
    }
  }
}
