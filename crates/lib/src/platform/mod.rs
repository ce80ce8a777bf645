pub mod os;
pub mod paths;

use os::Os;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("package was built on '{built}' and cannot execute on '{current}'; build it on the executing OS")]
pub struct PlatformMismatch {
  pub built: String,
  pub current: String,
}

/// Check whether a package built on `built_os` may execute on `current`.
///
/// Only a constrained platform is strict: it refuses packages built
/// anywhere else. Every other platform accepts any package.
pub fn check_platform(current: Os, built_os: &str) -> Result<(), PlatformMismatch> {
  if !current.accepts(built_os) {
    return Err(PlatformMismatch {
      built: built_os.to_string(),
      current: current.to_string(),
    });
  }
  Ok(())
}

/// Returns the identifier recorded in package manifests for the running OS.
pub fn current_os_id() -> &'static str {
  Os::current().map(Os::id).unwrap_or(std::env::consts::OS)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn windows_refuses_foreign_packages() {
    let err = check_platform(Os::Windows, "linux").unwrap_err();
    assert_eq!(err.built, "linux");
    assert_eq!(err.current, "windows");
  }

  #[test]
  fn windows_accepts_windows_packages() {
    assert!(check_platform(Os::Windows, "windows").is_ok());
  }

  #[test]
  fn unconstrained_platforms_accept_anything() {
    assert!(check_platform(Os::Linux, "darwin").is_ok());
    assert!(check_platform(Os::Darwin, "windows").is_ok());
  }
}
