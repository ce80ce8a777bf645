//! Package manifest assembly.

use std::path::Path;

use chrono::Utc;
use tracing::debug;

use crate::consts::{ID_SUFFIX_LEN, SHORT_COMMIT_LEN};
use crate::manifest::{Manifest, Profile};
use crate::platform::current_os_id;
use crate::seal::{FxInfo, PackageManifest};
use crate::util::format_bytes;
use crate::util::fs::random_name;

/// Generate a package id: UTC timestamp to the millisecond, the short commit
/// hash when a commit is known, and a random suffix so builds within the same
/// millisecond never share an id.
pub fn unique_id(commit: &str) -> String {
  let stamp = Utc::now().format("%Y%m%d%H%M%S%3f").to_string();
  let salt = random_name(ID_SUFFIX_LEN);
  if commit.is_empty() {
    return format!("{stamp}-{salt}");
  }
  let short: String = commit.chars().take(SHORT_COMMIT_LEN).collect();
  format!("{stamp}-{short}-{salt}")
}

pub(crate) struct PackageInfo<'a> {
  pub manifest: &'a Manifest,
  pub profile: &'a Profile,
  pub target: &'a Path,
  pub reference: &'a str,
  pub source: &'a str,
  pub commit: &'a str,
  pub branch: Option<&'a str>,
  pub archive_len: usize,
}

/// Describe a built package.
///
/// A manifest inside the target directory contributes its exported functions
/// and runtime so they can be executed from the package later.
pub(crate) fn package_manifest(info: PackageInfo<'_>) -> crate::Result<PackageManifest> {
  let mut labels = info.manifest.labels.clone();
  labels.extend(info.profile.labels.iter().map(|(k, v)| (k.clone(), v.clone())));

  let (functions, runtime) = match Manifest::load_optional(info.target)? {
    Some(nested) if nested.exports_functions() => {
      let functions: Vec<FxInfo> = nested
        .exported_functions()
        .map(|f| FxInfo::from_function(f, nested.function_input(f)))
        .collect();
      debug!(functions = functions.len(), "package exports functions");
      (functions, nested.runtime.clone())
    }
    _ => (Vec::new(), None),
  };

  let target = info
    .target
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();

  Ok(PackageManifest {
    kind: info.profile.kind.clone().unwrap_or_default(),
    license: info.profile.license.clone().unwrap_or_default(),
    reference: info.reference.to_string(),
    os: current_os_id().to_string(),
    profile: info.profile.name.clone(),
    labels,
    source: info.source.to_string(),
    commit: info.commit.to_string(),
    branch: info.branch.unwrap_or_default().to_string(),
    target,
    time: Utc::now().to_rfc3339(),
    size: format_bytes(info.archive_len as u64),
    functions,
    runtime,
    network: info.profile.network.clone(),
  })
}
