//! Build command integration tests.

use predicates::prelude::*;

use super::common::{SITE_MANIFEST, TestEnv};

#[test]
fn build_registers_package() {
  let env = TestEnv::new();
  env.write_source("build.yaml", SITE_MANIFEST);

  env
    .art_cmd()
    .arg("build")
    .arg(env.source_path())
    .args(["--copy", "-t", "acme/site"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Built artisan.library/acme/site:latest"))
    .stdout(predicate::str::contains("Profile: default"));

  env
    .art_cmd()
    .arg("ls")
    .assert()
    .success()
    .stdout(predicate::str::contains("acme/site:latest"));
}

#[test]
fn build_json_output_is_the_seal() {
  let env = TestEnv::new();
  env.write_source("build.yaml", SITE_MANIFEST);

  let output = env
    .art_cmd()
    .arg("build")
    .arg(env.source_path())
    .args(["--copy", "-t", "acme/site", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let seal: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert!(seal["digest"].as_str().unwrap().starts_with("sha256:"));
  assert_eq!(seal["manifest"]["profile"], "default");
  assert_eq!(seal["manifest"]["target"], "dist");
}

#[test]
fn build_without_manifest_fails() {
  let env = TestEnv::new();
  env.write_source("readme.txt", "no manifest here");

  env
    .art_cmd()
    .arg("build")
    .arg(env.source_path())
    .args(["--copy", "-t", "acme/site"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to build"));
}

#[test]
fn build_explicit_target_skips_manifest() {
  let env = TestEnv::new();
  env.write_source("public/index.html", "<h1>hi</h1>");

  env
    .art_cmd()
    .arg("build")
    .arg(env.source_path())
    .args(["--copy", "-t", "acme/static", "--target", "public"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Profile: content-only"));
}

#[test]
fn build_of_plain_directory_without_copy_fails() {
  let env = TestEnv::new();
  env.write_source("build.yaml", SITE_MANIFEST);

  env
    .art_cmd()
    .arg("build")
    .arg(env.source_path())
    .args(["-t", "acme/site"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not a git repository"));
}

#[test]
fn build_times_out_when_target_never_appears() {
  let env = TestEnv::new();
  env.write_source("build.yaml", "profiles:\n  - name: p\n    target: never\n    run: [\"true\"]\n");

  env
    .art_cmd()
    .arg("build")
    .arg(env.source_path())
    .args(["--copy", "-t", "acme/slow"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("did not appear"));
}

#[test]
fn run_executes_a_local_function() {
  let env = TestEnv::new();
  let out = env.output_path();
  env.write_source(
    "build.yaml",
    &format!(
      "functions:\n  - name: hello\n    run:\n      - echo \"hi ${{WHO}}\" > {}/hello.txt\n",
      out.display()
    ),
  );

  env
    .art_cmd()
    .arg("run")
    .arg("hello")
    .arg(env.source_path())
    .args(["-e", "WHO=there"])
    .assert()
    .success();

  assert_eq!(super::common::read(&out.join("hello.txt")), "hi there\n");
}
