use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use super::*;
use crate::config::WaitPolicy;
use crate::execute::ExecuteError;
use crate::manifest::ManifestError;
use crate::registry::RegistryError;
use crate::seal::{DigestStrategy, SealVerifier};
use crate::util::testutil::write_manifest;

fn builder(home: &Path) -> Builder {
  let mut config = Config::with_home(home);
  config.wait = WaitPolicy {
    interval: Duration::from_millis(10),
    max_attempts: 5,
  };
  let registry = Arc::new(Registry::new(config.registry_dir()));
  Builder::new(config, registry)
}

fn request(src: &Path, name: &str) -> BuildRequest {
  BuildRequest {
    source: SourceRequest {
      from: src.to_string_lossy().into_owned(),
      copy: true,
      ..Default::default()
    },
    name: PackageName::parse(name).unwrap(),
    profile: None,
    interactive: false,
  }
}

const SITE: &str = r#"
profiles:
  - name: default
    default: true
    target: ./dist
    run:
      - mkdir -p dist && echo hello > dist/index.html
"#;

#[cfg(unix)]
#[tokio::test]
async fn build_registers_a_verifiable_package() {
  let home = TempDir::new().unwrap();
  let src = TempDir::new().unwrap();
  write_manifest(src.path(), SITE);
  let builder = builder(home.path());

  let outcome = builder.build(request(src.path(), "acme/site")).await.unwrap();

  let entries = builder.registry().list().unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(outcome.seal.manifest.profile, "default");
  assert_eq!(outcome.seal.manifest.target, "dist");
  assert!(outcome.seal.manifest.functions.is_empty());

  let dest = home.path().join("opened");
  let seal = builder
    .registry()
    .open(&entries[0].name, None, &dest, &SealVerifier::default())
    .await
    .unwrap();
  assert_eq!(seal.digest, outcome.seal.digest);
  assert_eq!(std::fs::read_to_string(dest.join("index.html")).unwrap(), "hello\n");
  // the source tree was copied, never written to
  assert!(!src.path().join("dist").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn first_profile_is_chosen_without_default() {
  let home = TempDir::new().unwrap();
  let src = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();
  let log = out.path().join("chosen");
  write_manifest(
    src.path(),
    &format!(
      r#"
profiles:
  - name: alpha
    target: dist
    run:
      - mkdir -p dist && echo alpha >> {log}
  - name: beta
    target: dist
    run:
      - mkdir -p dist && echo beta >> {log}
"#,
      log = log.display()
    ),
  );
  let builder = builder(home.path());

  for _ in 0..2 {
    let outcome = builder.build(request(src.path(), "acme/pick")).await.unwrap();
    assert_eq!(outcome.seal.manifest.profile, "alpha");
  }
  assert_eq!(std::fs::read_to_string(&log).unwrap(), "alpha\nalpha\n");
}

#[cfg(unix)]
#[tokio::test]
async fn unknown_profile_is_a_manifest_error() {
  let home = TempDir::new().unwrap();
  let src = TempDir::new().unwrap();
  write_manifest(src.path(), SITE);

  let mut req = request(src.path(), "acme/site");
  req.profile = Some("nope".to_string());
  let err = builder(home.path()).build(req).await.unwrap_err();
  assert!(matches!(err, Error::Manifest(ManifestError::ProfileNotFound(ref p)) if p == "nope"));
}

#[cfg(unix)]
#[tokio::test]
async fn missing_target_times_out() {
  let home = TempDir::new().unwrap();
  let src = TempDir::new().unwrap();
  write_manifest(src.path(), "profiles:\n  - name: p\n    target: never\n    run: [\"true\"]\n");

  let err = builder(home.path()).build(request(src.path(), "acme/slow")).await.unwrap_err();
  assert!(matches!(err, Error::BuildTimeout { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn cancelled_wait_stops_the_build() {
  let home = TempDir::new().unwrap();
  let src = TempDir::new().unwrap();
  write_manifest(src.path(), "profiles:\n  - name: p\n    target: never\n    run: [\"true\"]\n");
  let builder = builder(home.path());
  builder.cancellation_token().cancel();

  let err = builder.build(request(src.path(), "acme/slow")).await.unwrap_err();
  assert!(matches!(err, Error::Cancelled(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn profile_without_target_cannot_be_packaged() {
  let home = TempDir::new().unwrap();
  let src = TempDir::new().unwrap();
  write_manifest(src.path(), "profiles:\n  - name: p\n    run: [\"true\"]\n");

  let err = builder(home.path()).build(request(src.path(), "acme/none")).await.unwrap_err();
  assert!(matches!(err, Error::MissingTarget { ref profile } if profile == "p"));
}

#[cfg(unix)]
#[tokio::test]
async fn failing_statement_aborts_the_build() {
  let home = TempDir::new().unwrap();
  let src = TempDir::new().unwrap();
  write_manifest(src.path(), "profiles:\n  - name: p\n    target: dist\n    run: [\"exit 3\", \"mkdir dist\"]\n");
  let builder = builder(home.path());

  let err = builder.build(request(src.path(), "acme/broken")).await.unwrap_err();
  assert!(matches!(err, Error::Execution(ExecuteError::CmdFailed { code: Some(3), .. })));
  assert!(builder.registry().list().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn run_leaves_unresolved_inputs_empty() {
  let dir = TempDir::new().unwrap();
  write_manifest(
    dir.path(),
    r#"
input:
  var:
    - name: ARTISAN_TEST_UNSET_INPUT
      required: true
functions:
  - name: greet
    run:
      - echo "[${ARTISAN_TEST_UNSET_INPUT}]" > out.txt
    input:
      var: [ARTISAN_TEST_UNSET_INPUT]
"#,
  );
  let home = TempDir::new().unwrap();

  builder(home.path())
    .run("greet", Some(&dir.path().to_string_lossy()), false, &Environment::new())
    .await
    .unwrap();
  assert_eq!(std::fs::read_to_string(dir.path().join("out.txt")).unwrap(), "[]\n");
}

#[cfg(unix)]
#[tokio::test]
async fn run_sees_manifest_env_and_injected_vars() {
  let dir = TempDir::new().unwrap();
  write_manifest(
    dir.path(),
    r#"
env:
  GREETING: hello
  FULL: ${GREETING} world
functions:
  - name: main
    env:
      TARGET: $((echo out.txt))
    run:
      - $(write)
  - name: write
    run:
      - echo "${FULL}|${ARTISAN_BUILD_PATH}" > out.txt
"#,
  );
  let home = TempDir::new().unwrap();

  builder(home.path())
    .run("main", Some(&dir.path().to_string_lossy()), false, &Environment::new())
    .await
    .unwrap();

  let canonical = dunce::canonicalize(dir.path()).unwrap();
  assert_eq!(
    std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
    format!("hello world|{}\n", canonical.display())
  );
}

#[cfg(unix)]
#[tokio::test]
async fn call_depth_is_bounded() {
  let dir = TempDir::new().unwrap();
  write_manifest(dir.path(), "functions:\n  - name: spin\n    run: [\"$(spin)\"]\n");
  let home = TempDir::new().unwrap();
  let mut builder = builder(home.path());
  builder.config.max_call_depth = Some(5);

  let err = builder
    .run("spin", Some(&dir.path().to_string_lossy()), false, &Environment::new())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::CallDepthExceeded { max: 5, .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn profile_calls_see_the_env_from_before_the_profile() {
  let home = TempDir::new().unwrap();
  let src = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();
  write_manifest(
    src.path(),
    &format!(
      r#"
env:
  ARTISAN_TEST_SHARED: shared
profiles:
  - name: default
    target: dist
    env:
      ARTISAN_TEST_PROFILE_ONLY: profile
    run:
      - mkdir -p dist
      - echo "[${{ARTISAN_TEST_PROFILE_ONLY}}]" > {out}/profile.txt
      - $(dump)
functions:
  - name: dump
    run:
      - env > {out}/dump.txt
"#,
      out = out.path().display()
    ),
  );

  builder(home.path()).build(request(src.path(), "acme/env")).await.unwrap();

  let read = |f: &str| std::fs::read_to_string(out.path().join(f)).unwrap();
  assert_eq!(read("profile.txt"), "[profile]\n");
  let dumped = read("dump.txt");
  assert!(dumped.lines().any(|l| l == "ARTISAN_TEST_SHARED=shared"), "{dumped}");
  assert!(!dumped.contains("ARTISAN_TEST_PROFILE_ONLY"), "{dumped}");
}

#[tokio::test]
async fn run_rejects_remote_paths() {
  let home = TempDir::new().unwrap();
  let err = builder(home.path())
    .run("main", Some("https://example.com/repo"), false, &Environment::new())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Source(SourceError::RemotePath(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn run_reports_unknown_functions() {
  let dir = TempDir::new().unwrap();
  write_manifest(dir.path(), "functions:\n  - name: a\n    run: [\"true\"]\n");
  let home = TempDir::new().unwrap();

  let err = builder(home.path())
    .run("b", Some(&dir.path().to_string_lossy()), false, &Environment::new())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::FunctionNotFound(ref f) if f == "b"));
}

/// Records every audit event it sees.
#[derive(Default, Clone)]
struct Recorder(Arc<Mutex<Vec<(String, bool)>>>);

impl AuditStrategy for Recorder {
  fn record(&self, event: &AuditEvent<'_>) {
    self
      .0
      .lock()
      .unwrap()
      .push((event.function.to_string(), event.success));
  }
}

/// Source tree whose target carries its own manifest with one exported
/// function writing into `out`.
fn app_source(out: &Path) -> TempDir {
  let src = TempDir::new().unwrap();
  write_manifest(
    src.path(),
    "profiles:\n  - name: default\n    target: app\n    run: [\"true\"]\n",
  );
  write_manifest(
    &src.path().join("app"),
    &format!(
      r#"
functions:
  - name: deploy
    export: true
    run:
      - echo "deployed ${{MODE}}" > {out}/deploy.txt
  - name: internal
    run:
      - echo internal > {out}/internal.txt
"#,
      out = out.display()
    ),
  );
  src
}

#[cfg(unix)]
#[tokio::test]
async fn execute_runs_exported_function_and_cleans_up() {
  let home = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();
  let src = app_source(out.path());
  let recorder = Recorder::default();
  let builder = builder(home.path()).with_audit(Box::new(recorder.clone()));

  let built = builder.build(request(src.path(), "acme/app")).await.unwrap();
  assert_eq!(built.seal.manifest.functions.len(), 1);

  let path = home.path().join("exec");
  let mut req = ExecuteRequest::new(PackageName::parse("acme/app").unwrap(), "deploy");
  req.path = Some(path.clone());
  req.env = Environment::from_pairs([("MODE", "blue")]);
  builder.execute(req).await.unwrap();

  assert_eq!(
    std::fs::read_to_string(out.path().join("deploy.txt")).unwrap(),
    "deployed blue\n"
  );
  assert!(!path.exists());
  assert_eq!(*recorder.0.lock().unwrap(), vec![("deploy".to_string(), true)]);
}

#[cfg(unix)]
#[tokio::test]
async fn execute_preserves_files_when_asked() {
  let home = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();
  let src = app_source(out.path());
  let builder = builder(home.path());
  builder.build(request(src.path(), "acme/app")).await.unwrap();

  let path = home.path().join("kept");
  let mut req = ExecuteRequest::new(PackageName::parse("acme/app").unwrap(), "deploy");
  req.path = Some(path.clone());
  req.preserve_files = true;
  builder.execute(req).await.unwrap();

  assert!(path.join("build.yaml").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn execute_refuses_functions_that_are_not_exported() {
  let home = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();
  let src = app_source(out.path());
  let builder = builder(home.path());
  builder.build(request(src.path(), "acme/app")).await.unwrap();

  let path = home.path().join("exec");
  let mut req = ExecuteRequest::new(PackageName::parse("acme/app").unwrap(), "internal");
  req.path = Some(path.clone());
  let err = builder.execute(req).await.unwrap_err();

  assert!(matches!(err, Error::FunctionNotExported { ref function, .. } if function == "internal"));
  assert!(!out.path().join("internal.txt").exists());
  assert!(!path.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn execute_rejects_a_tampered_archive_before_extracting() {
  let home = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();
  let src = app_source(out.path());
  let builder = builder(home.path());
  let built = builder.build(request(src.path(), "acme/app")).await.unwrap();

  let mut bytes = std::fs::read(&built.entry.archive).unwrap();
  let last = bytes.len() - 1;
  bytes[last] ^= 0xff;
  std::fs::write(&built.entry.archive, bytes).unwrap();

  let path = home.path().join("exec");
  let mut req = ExecuteRequest::new(PackageName::parse("acme/app").unwrap(), "deploy");
  req.path = Some(path.clone());
  req.preserve_files = true;
  let err = builder.execute(req).await.unwrap_err();

  assert!(matches!(err, Error::Integrity { .. }));
  assert!(!path.exists());
  assert!(!out.path().join("deploy.txt").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn signed_builds_verify_with_the_scoped_key() {
  let home = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();
  let src = app_source(out.path());
  let builder = builder(home.path()).require_signature(true);
  let name = PackageName::parse("acme/app").unwrap();
  builder.keys().generate(&name.key_scope(), false).unwrap();

  let built = builder.build(request(src.path(), "acme/app")).await.unwrap();
  assert!(built.seal.is_signed());

  builder.execute(ExecuteRequest::new(name, "deploy")).await.unwrap();
  assert!(out.path().join("deploy.txt").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn unsigned_package_is_refused_when_signatures_are_required() {
  let home = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();
  let src = app_source(out.path());
  let builder = builder(home.path()).require_signature(true);
  builder.build(request(src.path(), "acme/app")).await.unwrap();

  let err = builder
    .execute(ExecuteRequest::new(PackageName::parse("acme/app").unwrap(), "deploy"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Authentication { .. }));
}

#[tokio::test]
async fn failed_execute_leaves_an_existing_directory_alone() {
  let home = TempDir::new().unwrap();
  let project = TempDir::new().unwrap();
  std::fs::write(project.path().join("precious.txt"), "keep").unwrap();

  let mut req = ExecuteRequest::new(PackageName::parse("acme/missing").unwrap(), "deploy");
  req.path = Some(project.path().to_path_buf());
  let err = builder(home.path()).execute(req).await.unwrap_err();

  assert!(matches!(err, Error::Registry(RegistryError::NotFound(_))));
  assert_eq!(std::fs::read_to_string(project.path().join("precious.txt")).unwrap(), "keep");
}

/// Digest over lengths only, distinct from the default strategy.
struct LengthDigest;

impl DigestStrategy for LengthDigest {
  fn digest(&self, archive: &[u8], manifest_json: &[u8]) -> String {
    format!("len:{}:{}", archive.len(), manifest_json.len())
  }
}

#[cfg(unix)]
#[tokio::test]
async fn execute_verifies_with_the_registry_digest() {
  let home = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();
  let src = app_source(out.path());
  let config = Config::with_home(home.path());
  let registry = Arc::new(Registry::new(config.registry_dir()).with_digest(Arc::new(LengthDigest)));
  let builder = Builder::new(config, registry);

  let built = builder.build(request(src.path(), "acme/app")).await.unwrap();
  assert!(built.seal.digest.starts_with("len:"));

  builder
    .execute(ExecuteRequest::new(PackageName::parse("acme/app").unwrap(), "deploy"))
    .await
    .unwrap();
  assert!(out.path().join("deploy.txt").exists());
}
