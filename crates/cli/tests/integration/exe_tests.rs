//! Exe command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, read};

/// Package whose target carries an exported `deploy` and a private `internal`.
fn app_env() -> TestEnv {
  let env = TestEnv::new();
  let out = env.output_path();
  env.write_source("build.yaml", "profiles:\n  - name: default\n    target: app\n    run: [\"true\"]\n");
  env.write_source(
    "app/build.yaml",
    &format!(
      r#"
input:
  var:
    - name: MODE
      default: green
functions:
  - name: deploy
    description: Deploy the app
    export: true
    input:
      var: [MODE]
    run:
      - echo "deploy ${{MODE}}" > {out}/deploy.txt
  - name: internal
    run:
      - echo internal > {out}/internal.txt
"#,
      out = out.display()
    ),
  );
  env.build("acme/app");
  env
}

#[test]
fn exe_runs_exported_function() {
  let env = app_env();

  env
    .art_cmd()
    .args(["exe", "acme/app", "deploy"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Executed deploy"));

  assert_eq!(read(&env.output_path().join("deploy.txt")), "deploy green\n");
}

#[test]
fn exe_passes_extra_environment() {
  let env = app_env();

  env
    .art_cmd()
    .args(["exe", "acme/app", "deploy", "-e", "MODE=blue"])
    .assert()
    .success();

  assert_eq!(read(&env.output_path().join("deploy.txt")), "deploy blue\n");
}

#[test]
fn exe_refuses_non_exported_function() {
  let env = app_env();

  env
    .art_cmd()
    .args(["exe", "acme/app", "internal"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not exported"));

  assert!(!env.output_path().join("internal.txt").exists());
}

#[test]
fn exe_preserves_files_when_asked() {
  let env = app_env();
  let dest = env.temp.path().join("kept");

  env
    .art_cmd()
    .args(["exe", "acme/app", "deploy", "--preserve-files", "--path"])
    .arg(&dest)
    .assert()
    .success();

  assert!(dest.join("build.yaml").exists());
}

#[test]
fn exe_requiring_signature_refuses_unsigned_package() {
  let env = app_env();

  env
    .art_cmd()
    .args(["exe", "acme/app", "deploy", "--require-signature"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("authentication failed"));
}

#[test]
fn info_lists_exported_functions() {
  let env = app_env();

  env
    .art_cmd()
    .args(["info", "acme/app"])
    .assert()
    .success()
    .stdout(predicate::str::contains("deploy Deploy the app"))
    .stdout(predicate::str::contains("internal").not());
}
