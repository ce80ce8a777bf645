//! Registry command integration tests (open, tag, rm, export, import).

use predicates::prelude::*;

use super::common::{SITE_MANIFEST, TestEnv, read};

fn site_env() -> TestEnv {
  let env = TestEnv::new();
  env.write_source("build.yaml", SITE_MANIFEST);
  env.build("acme/site");
  env
}

#[test]
fn open_extracts_verified_files() {
  let env = site_env();
  let dest = env.temp.path().join("opened");

  env
    .art_cmd()
    .args(["open", "acme/site"])
    .arg(&dest)
    .assert()
    .success()
    .stdout(predicate::str::contains("Opened"));

  assert_eq!(read(&dest.join("index.html")), "hello\n");
}

#[test]
fn tag_then_rm_keeps_the_other_name() {
  let env = site_env();

  env.art_cmd().args(["tag", "acme/site", "acme/site:v1"]).assert().success();
  env.art_cmd().args(["rm", "--force", "acme/site"]).assert().success();

  env
    .art_cmd()
    .arg("ls")
    .assert()
    .success()
    .stdout(predicate::str::contains("acme/site:v1"))
    .stdout(predicate::str::contains("acme/site:latest").not());

  let dest = env.temp.path().join("opened");
  env
    .art_cmd()
    .args(["open", "acme/site:v1"])
    .arg(&dest)
    .assert()
    .success();
}

#[test]
fn export_then_import_into_another_home() {
  let env = site_env();
  let stream = env.temp.path().join("site.tar");

  env
    .art_cmd()
    .args(["export", "acme/site", "-d"])
    .arg(&stream)
    .assert()
    .success()
    .stdout(predicate::str::contains("Exported 1 package(s)"));

  let other = TestEnv::new();
  other
    .art_cmd()
    .arg("import")
    .arg(&stream)
    .assert()
    .success()
    .stdout(predicate::str::contains("Imported 1 package(s)"));

  let digest = |env: &TestEnv| {
    let out = env.art_cmd().args(["info", "acme/site", "-o", "json"]).output().unwrap();
    let seal: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    seal["digest"].as_str().unwrap().to_string()
  };
  assert_eq!(digest(&env), digest(&other));
}

#[test]
fn import_of_unsupported_scheme_fails() {
  let env = TestEnv::new();

  env
    .art_cmd()
    .args(["import", "ftp://example.com/site.tar"])
    .assert()
    .failure();
}
