//! Operating systems as recorded in package manifests.
//!
//! A package stores the id of the OS it was built on (`linux`, `darwin`,
//! `windows`). Execution compares that id against the running OS.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  Darwin,
  Windows,
}

impl Os {
  pub const ALL: [Os; 3] = [Os::Linux, Os::Darwin, Os::Windows];

  /// The running OS, or `None` when packages have no id for it.
  pub fn current() -> Option<Self> {
    Self::from_rust_os(std::env::consts::OS)
  }

  fn from_rust_os(os: &str) -> Option<Self> {
    match os {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::Darwin),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Parse an id read back from a package manifest.
  pub fn from_id(id: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|os| os.id() == id)
  }

  pub fn id(self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::Darwin => "darwin",
      Self::Windows => "windows",
    }
  }

  /// Constrained platforms only run packages built on themselves.
  pub fn is_constrained(self) -> bool {
    matches!(self, Self::Windows)
  }

  /// Whether a package built on `built` may execute on this OS.
  pub fn accepts(self, built: &str) -> bool {
    !self.is_constrained() || Self::from_id(built) == Some(self)
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.id())
  }
}
