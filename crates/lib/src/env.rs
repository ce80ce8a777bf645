//! Ordered environment variable table.
//!
//! An [`Environment`] keeps keys unique and remembers insertion order so that
//! variables declared later can be expanded against earlier siblings. Both
//! [`Environment::append`] and [`Environment::merge`] follow the same rule:
//! overlapping keys take the new value, every other key is preserved.

use std::fmt;

use indexmap::IndexMap;

use crate::placeholder;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
  vars: IndexMap<String, String>,
}

impl Environment {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot the current process environment.
  pub fn from_process() -> Self {
    Self::from_pairs(std::env::vars())
  }

  pub fn from_pairs<I, K, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let mut env = Self::new();
    for (k, v) in pairs {
      env.insert(k, v);
    }
    env
  }

  /// Return a new environment with `vars` layered over this one.
  pub fn append<I, K, V>(&self, vars: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let mut env = self.clone();
    for (k, v) in vars {
      env.insert(k, v);
    }
    env
  }

  /// Layer `other` over this environment in place.
  pub fn merge(&mut self, other: &Environment) {
    for (k, v) in other.iter() {
      self.insert(k, v);
    }
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(|v| v.as_str())
  }

  pub fn contains(&self, key: &str) -> bool {
    self.vars.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.vars.keys().map(|k| k.as_str())
  }

  /// Replace `${NAME}` references with values from this environment.
  ///
  /// Unknown names are left as written.
  pub fn substitute(&self, text: &str) -> String {
    placeholder::substitute_vars(text, |name| self.get(name))
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self::from_pairs(iter)
  }
}

impl<'a> IntoIterator for &'a Environment {
  type Item = (&'a String, &'a String);
  type IntoIter = indexmap::map::Iter<'a, String, String>;

  fn into_iter(self) -> Self::IntoIter {
    self.vars.iter()
  }
}

/// Lists variable names only; values may hold secrets.
impl fmt::Display for Environment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let keys: Vec<&str> = self.keys().collect();
    write!(f, "[{}]", keys.join(", "))
  }
}
