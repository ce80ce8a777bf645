//! Project manifest types (`build.yaml`).
//!
//! The manifest is loaded once per invocation and treated as read-only
//! afterwards. It declares:
//! - `env`: variables visible to every profile and function
//! - `labels`: metadata copied into package manifests
//! - `input`: variables, secrets and keys that functions may bind to
//! - `profiles`: named build recipes with a target path
//! - `functions`: named statement sequences, optionally exported
//!
//! # Example
//!
//! ```yaml
//! env:
//!   APP_NAME: demo
//! profiles:
//!   - name: default
//!     default: true
//!     target: ./dist
//!     run:
//!       - mkdir -p dist && echo ${APP_NAME} > dist/name.txt
//! functions:
//!   - name: deploy
//!     export: true
//!     input:
//!       var: [REGION]
//!     run:
//!       - ./deploy.sh ${REGION}
//! ```

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::consts::{CONTENT_ONLY_PROFILE, CONTENT_ONLY_TYPE};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub env: IndexMap<String, String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub labels: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub input: Option<Input>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub profiles: Vec<Profile>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub functions: Vec<Function>,
  /// Runtime image used to execute exported functions.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub runtime: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub default: bool,
  /// Path to package, may contain `${VAR}` references.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target: Option<String>,
  #[serde(default)]
  pub run: Vec<String>,
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub env: IndexMap<String, String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub labels: BTreeMap<String, String>,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub license: Option<String>,
  /// Opaque network requirements copied verbatim into the package manifest.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub network: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub export: Option<bool>,
  #[serde(default)]
  pub run: Vec<String>,
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub env: IndexMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub input: Option<InputBinding>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub runtime: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub credits: Option<u32>,
}

impl Function {
  pub fn is_exported(&self) -> bool {
    self.export.unwrap_or(false)
  }
}

/// Names of manifest-level inputs a function binds to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBinding {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub var: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub secret: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub key: Vec<String>,
}

/// Inputs declared by a manifest or required by an exported function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub key: Vec<Key>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub secret: Vec<Secret>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub var: Vec<Var>,
}

impl Input {
  pub fn is_empty(&self) -> bool {
    self.key.is_empty() && self.secret.is_empty() && self.var.is_empty()
  }

  pub fn contains_var(&self, name: &str) -> bool {
    self.var.iter().any(|v| v.name == name)
  }

  pub fn contains_secret(&self, name: &str) -> bool {
    self.secret.iter().any(|s| s.name == name)
  }

  pub fn contains_key(&self, name: &str) -> bool {
    self.key.iter().any(|k| k.name == name)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Var {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub required: bool,
  /// Value type hint: `string`, `path`, `uri`, `name`.
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<String>,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default = "default_true")]
  pub required: bool,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// True for a private (signing) key, false for a public (verification) key.
  #[serde(default)]
  pub private: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub package_group: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub package_name: Option<String>,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub value: String,
}

fn default_true() -> bool {
  true
}

impl Manifest {
  /// Synthetic manifest wrapping just `target`, used to package raw content.
  pub fn content_only(target: &str) -> Self {
    Self {
      profiles: vec![Profile {
        name: CONTENT_ONLY_PROFILE.to_string(),
        default: true,
        target: Some(target.to_string()),
        kind: Some(CONTENT_ONLY_TYPE.to_string()),
        ..Default::default()
      }],
      ..Default::default()
    }
  }

  pub fn profile(&self, name: &str) -> Option<&Profile> {
    self.profiles.iter().find(|p| p.name == name)
  }

  /// The profile flagged default, if any.
  pub fn default_profile(&self) -> Option<&Profile> {
    self.profiles.iter().find(|p| p.default)
  }

  pub fn function(&self, name: &str) -> Option<&Function> {
    self.functions.iter().find(|f| f.name == name)
  }

  pub fn exported_functions(&self) -> impl Iterator<Item = &Function> {
    self.functions.iter().filter(|f| f.is_exported())
  }

  pub fn exports_functions(&self) -> bool {
    self.exported_functions().next().is_some()
  }
}
