//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Minimal project: one default profile producing `dist/index.html`.
pub const SITE_MANIFEST: &str = r#"
profiles:
  - name: default
    default: true
    target: dist
    run:
      - mkdir -p dist && echo hello > dist/index.html
"#;

/// Isolated test environment.
///
/// Each test gets its own artisan home, source tree and output directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Write a file relative to the source directory.
  pub fn write_source(&self, relative_path: &str, content: &str) {
    let path = self.source_path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  fn dir(&self, name: &str) -> PathBuf {
    let p = self.temp.path().join(name);
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Artisan home (registry, keys, build and run areas).
  pub fn home_path(&self) -> PathBuf {
    self.dir("home")
  }

  /// Project source tree.
  pub fn source_path(&self) -> PathBuf {
    self.dir("src")
  }

  /// Where test functions write their artifacts.
  pub fn output_path(&self) -> PathBuf {
    self.dir("output")
  }

  /// Get a pre-configured Command for the art binary.
  ///
  /// Sets `ARTISAN_HOME` to the isolated home and shortens the target wait.
  pub fn art_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("art");
    cmd.env("ARTISAN_HOME", self.home_path());
    cmd.env("ARTISAN_WAIT_INTERVAL_MS", "20");
    cmd.env("ARTISAN_WAIT_ATTEMPTS", "5");
    cmd.env_remove("ARTISAN_REMOTE");
    cmd
  }

  /// Build the source tree as `name` (copy mode, no git needed).
  pub fn build(&self, name: &str) {
    self
      .art_cmd()
      .arg("build")
      .arg(self.source_path())
      .args(["--copy", "-t", name])
      .assert()
      .success();
  }
}

pub fn read(path: &Path) -> String {
  std::fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}
