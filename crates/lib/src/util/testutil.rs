//! Test utilities for artisan-lib.
//!
//! Helpers for tests that need a git repository or a project manifest on disk.

use std::path::Path;
use std::process::Command;

/// Returns true if a `git` binary is available on PATH.
pub fn git_available() -> bool {
  Command::new("git")
    .arg("--version")
    .output()
    .map(|o| o.status.success())
    .unwrap_or(false)
}

/// Initialise a git repository in `dir` and commit everything in it.
///
/// Returns `false` when git is unavailable so callers can skip.
pub fn init_git_repo(dir: &Path) -> bool {
  if !git_available() {
    return false;
  }

  let run = |args: &[&str]| {
    Command::new("git")
      .args(args)
      .current_dir(dir)
      .env("GIT_AUTHOR_NAME", "test")
      .env("GIT_AUTHOR_EMAIL", "test@example.com")
      .env("GIT_COMMITTER_NAME", "test")
      .env("GIT_COMMITTER_EMAIL", "test@example.com")
      .output()
      .map(|o| o.status.success())
      .unwrap_or(false)
  };

  run(&["init", "-q"])
    && run(&["add", "-A"])
    && run(&["-c", "commit.gpgsign=false", "commit", "-q", "--allow-empty", "-m", "init"])
}

/// Write a `build.yaml` into `dir`.
pub fn write_manifest(dir: &Path, content: &str) {
  std::fs::create_dir_all(dir).unwrap();
  std::fs::write(dir.join(crate::consts::BUILD_FILE), content).unwrap();
}
