//! Bounded wait for a build target to appear on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::WaitPolicy;

#[derive(Debug, Error)]
pub enum WaitError {
  #[error("target {path} did not appear after {waited:?}")]
  Timeout { path: PathBuf, waited: Duration },

  #[error("wait for target {path} was cancelled")]
  Cancelled { path: PathBuf },
}

/// Poll for `path` up to `policy.max_attempts` times.
pub async fn wait_for_target(path: &Path, policy: &WaitPolicy) -> Result<(), WaitError> {
  wait_for_target_until(path, policy, &CancellationToken::new()).await
}

/// Like [`wait_for_target`], but gives up early when `cancel` fires.
pub async fn wait_for_target_until(
  path: &Path,
  policy: &WaitPolicy,
  cancel: &CancellationToken,
) -> Result<(), WaitError> {
  for attempt in 0..policy.max_attempts {
    if exists(path).await {
      debug!(path = %path.display(), attempt, "target present");
      return Ok(());
    }
    if attempt == 0 {
      debug!(path = %path.display(), "waiting for target");
    }

    tokio::select! {
      _ = cancel.cancelled() => {
        return Err(WaitError::Cancelled { path: path.to_path_buf() });
      }
      _ = tokio::time::sleep(policy.interval) => {}
    }
  }

  if exists(path).await {
    return Ok(());
  }

  warn!(path = %path.display(), attempts = policy.max_attempts, "target never appeared");
  Err(WaitError::Timeout {
    path: path.to_path_buf(),
    waited: policy.timeout(),
  })
}

async fn exists(path: &Path) -> bool {
  tokio::fs::try_exists(path).await.unwrap_or(false)
}
