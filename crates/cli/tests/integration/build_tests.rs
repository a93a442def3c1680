use predicates::prelude::*;
use serial_test::serial;

use super::common::TestEnv;

const CSS_CONFIG: &str = r#"
dest = "dist/extracted.css"
exts = ["css"]
root = "src"

[[transforms]]
builtin = "trim"
"#;

fn css_project(config: &str) -> TestEnv {
  let env = TestEnv::with_config(config);
  env.write_file("src/b.css", "b\n");
  env.write_file("src/a.css", "  a  ");
  env.write_file("src/main.js", "import './a.css';");
  env
}

#[test]
#[serial]
fn build_writes_extracted_files_in_order() {
  let env = css_project(CSS_CONFIG);

  env
    .extractify_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete!"))
    .stdout(predicate::str::contains("Files extracted: 2"));

  assert_eq!(env.read_file("dist/extracted.css"), "a\nb");
}

#[test]
#[serial]
fn build_with_explicit_config_path() {
  let env = css_project(CSS_CONFIG);
  let config = env.config_path.clone();
  let elsewhere = tempfile::TempDir::new().unwrap();

  let mut cmd = env.extractify_cmd();
  cmd
    .current_dir(elsewhere.path())
    .arg("build")
    .arg("--config")
    .arg(&config)
    .assert()
    .success();

  assert_eq!(env.read_file("dist/extracted.css"), "a\nb");
}

#[test]
#[serial]
fn build_overwrites_previous_output() {
  let env = css_project(CSS_CONFIG);
  env.write_file("dist/extracted.css", "old output from a previous build");

  env.extractify_cmd().arg("build").assert().success();

  assert_eq!(env.read_file("dist/extracted.css"), "a\nb");
}

#[test]
#[serial]
fn bundle_flag_writes_stripped_bundle() {
  let env = css_project(CSS_CONFIG);

  env
    .extractify_cmd()
    .args(["build", "--bundle", "bundle.js"])
    .assert()
    .success();

  let bundle = env.read_file("bundle.js");
  assert!(bundle.contains("import './a.css';"));
  assert!(bundle.contains("a.css\n\n"));
  assert!(!bundle.contains("  a  "));
}

#[test]
#[serial]
fn json_output_is_the_report() {
  let env = css_project(CSS_CONFIG);

  let output = env
    .extractify_cmd()
    .args(["--output", "json", "build"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["generation"], 1);
  assert_eq!(report["files"].as_array().unwrap().len(), 2);
  assert_eq!(report["missing"].as_array().unwrap().len(), 0);
  assert_eq!(report["bytes"], 3);
}

#[test]
#[serial]
fn external_modules_are_skipped_unless_global() {
  let env = TestEnv::with_config("dest = \"out.css\"\nexts = [\"css\"]\nroot = \"src\"");
  env.write_file("src/app.css", "app");
  env.write_file("src/node_modules/lib/lib.css", "lib");

  env
    .extractify_cmd()
    .arg("build")
    .assert()
    .success()
    .stderr(predicate::str::contains("1 file(s) had no extracted output"));
  assert_eq!(env.read_file("out.css"), "app");

  std::fs::write(
    &env.config_path,
    "dest = \"out.css\"\nexts = [\"css\"]\nroot = \"src\"\nglobal = true",
  )
  .unwrap();
  env.extractify_cmd().arg("build").assert().success();
  assert_eq!(env.read_file("out.css"), "app\nlib");
}

#[test]
#[serial]
fn explicit_modules_set_the_order() {
  let env = TestEnv::with_config("dest = \"out.css\"\nexts = [\"css\"]\nmodules = [\"z.css\", \"a.css\"]");
  env.write_file("a.css", "a");
  env.write_file("z.css", "z");

  env.extractify_cmd().arg("build").assert().success();

  assert_eq!(env.read_file("out.css"), "z\na");
}

#[test]
#[serial]
fn destination_is_not_read_as_a_module() {
  let env = TestEnv::with_config("dest = \"out.css\"\nexts = [\"css\"]");
  env.write_file("a.css", "a");

  env.extractify_cmd().arg("build").assert().success();
  env.extractify_cmd().arg("build").assert().success();

  assert_eq!(env.read_file("out.css"), "a");
}

#[test]
#[serial]
fn rebuild_ignores_config_and_bundle_output() {
  let env = TestEnv::with_config("dest = \"out.txt\"\nexts = [\"js\"]\nroot = \".\"");
  env.write_file("a.js", "a");

  for _ in 0..2 {
    env
      .extractify_cmd()
      .args(["build", "--bundle", "bundle.js"])
      .assert()
      .success();
    assert_eq!(env.read_file("out.txt"), "a");
  }

  let bundle = env.read_file("bundle.js");
  assert!(!bundle.contains("extractify.toml"));
  assert!(!bundle.contains("bundle.js"));
}

#[cfg(unix)]
#[test]
#[serial]
fn command_transforms_run_per_file() {
  let env = TestEnv::with_config(
    r#"
dest = "out.css"
exts = ["css"]
root = "src"

[[transforms]]
cmd = "tr a-z A-Z"

[[transforms]]
cmd = "cat; printf '/*%s*/' \"$SUFFIX\""
env = { SUFFIX = "done" }
"#,
  );
  env.write_file("src/a.css", "a");
  env.write_file("src/b.css", "b");

  env.extractify_cmd().arg("build").assert().success();

  assert_eq!(env.read_file("out.css"), "A/*done*/\nB/*done*/");
}

#[cfg(unix)]
#[test]
#[serial]
fn failing_transform_fails_the_build() {
  let env = TestEnv::with_config(
    r#"
dest = "out.css"
exts = ["css"]
root = "src"

[[transforms]]
cmd = "exit 4"
"#,
  );
  env.write_file("src/a.css", "a");

  env
    .extractify_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Build failed"));

  assert!(!env.path("out.css").exists());
}
