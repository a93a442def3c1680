use std::path::{Path, PathBuf};
use std::time::Duration;

use extractify_lib::engine::{Bundle, EngineError, Module};
use extractify_lib::extract::COLLECTOR_STAGE;
use extractify_lib::transform::{Builtin, factory, map_stage};
use extractify_lib::{ExtractError, ExtractOptions, Extractify};
use tempfile::TempDir;

use super::common::{TestBuild, css_modules, extract_error, fails_on};

#[tokio::test]
async fn outputs_are_joined_in_pack_order() {
  let mut build = TestBuild::css(css_modules(&["a", "b", "c"]));

  build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), "a\nb\nc");
  let report = build.plugin.last_report().unwrap();
  assert_eq!(
    report.files,
    vec![PathBuf::from("a.css"), PathBuf::from("b.css"), PathBuf::from("c.css")]
  );
  assert!(report.missing.is_empty());
  assert_eq!(report.bytes, 5);
}

#[tokio::test]
async fn pack_order_not_completion_order_decides() {
  // Earlier files take longer to extract than later ones.
  let slow_first = factory(|file: &Path| {
    let delay = if file.ends_with("a.css") { 60 } else { 0 };
    map_stage(move |_, content| {
      std::thread::sleep(Duration::from_millis(delay));
      Ok(content)
    })
  });
  let mut build = TestBuild::new(css_modules(&["a", "b", "c"]), |o| o.exts(["css"]).transform(slow_first));

  build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), "a\nb\nc");
}

#[tokio::test]
async fn out_of_scope_modules_pass_through() {
  let modules = vec![
    Module::local("a.css", "a"),
    Module::local("main.js", "require('./a.css');"),
  ];
  let mut build = TestBuild::css(modules);

  let output = build.bundle.bundle().await.unwrap();

  assert_eq!(output.record(Path::new("main.js")).unwrap().source, "require('./a.css');");
  let cycle = build.plugin.current_cycle();
  assert!(!cycle.store().contains(Path::new("main.js")));
  let report = build.plugin.last_report().unwrap();
  assert_eq!(report.files, vec![PathBuf::from("a.css")]);
  assert!(report.missing.is_empty());
  assert_eq!(build.dest_content(), "a");
}

#[tokio::test]
async fn in_scope_modules_are_bundled_empty() {
  let mut build = TestBuild::new(css_modules(&["a", "b"]), |o| {
    o.exts(["css"]).transform(Builtin::Upper.factory())
  });

  let output = build.bundle.bundle().await.unwrap();

  assert_eq!(output.records.len(), 2);
  assert!(output.records.iter().all(|r| r.source.is_empty()));
  assert_eq!(build.dest_content(), "A\nB");
}

#[tokio::test]
async fn empty_transform_list_extracts_original_content() {
  let source = "body {\n  color: red;\n}\n";
  let mut build = TestBuild::css(vec![Module::local("a.css", source)]);

  build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), source);
}

#[tokio::test]
async fn transforms_apply_in_list_order() {
  let mut build = TestBuild::new(vec![Module::local("x.txt", "ab")], |o| {
    o.exts(["txt"])
      .transform(Builtin::Upper.factory())
      .transform(Builtin::Reverse.factory())
  });

  build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), "BA");
}

#[tokio::test]
async fn files_without_extraction_are_omitted_without_separators() {
  // With `global = false` external modules are never intercepted, but the
  // collector still sees them while packing.
  let modules = vec![
    Module::external("node_modules/lib/first.css", "first"),
    Module::local("a.css", "a"),
    Module::external("node_modules/lib/mid.css", "mid"),
    Module::local("c.css", "c"),
    Module::external("node_modules/lib/last.css", "last"),
  ];
  let mut build = TestBuild::css(modules);

  let output = build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), "a\nc");
  let report = build.plugin.last_report().unwrap();
  assert_eq!(report.files, vec![PathBuf::from("a.css"), PathBuf::from("c.css")]);
  assert_eq!(report.missing.len(), 3);
  // not intercepted, so not stripped either
  assert_eq!(output.record(Path::new("node_modules/lib/mid.css")).unwrap().source, "mid");
}

#[tokio::test]
async fn global_extracts_external_modules_too() {
  let modules = vec![
    Module::local("a.css", "a"),
    Module::external("node_modules/lib/b.css", "b"),
  ];
  let mut build = TestBuild::new(modules, |o| o.exts(["css"]).global(true));

  let output = build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), "a\nb");
  assert!(output.records.iter().all(|r| r.source.is_empty()));
}

#[tokio::test]
async fn nothing_in_scope_writes_empty_destination() {
  let mut build = TestBuild::css(vec![Module::local("main.js", "1")]);

  build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), "");
  assert_eq!(build.plugin.last_report().unwrap().bytes, 0);
}

#[tokio::test]
async fn repeated_paths_are_recorded_each_time() {
  let modules = vec![Module::local("a.css", "a"), Module::local("a.css", "a")];
  let mut build = TestBuild::css(modules);

  build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), "a\na");
}

#[tokio::test]
async fn destination_is_overwritten() {
  let mut build = TestBuild::css(css_modules(&["a"]));
  std::fs::write(&build.dest, "stale content that is longer").unwrap();

  build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), "a");
}

#[tokio::test]
async fn transform_failure_fails_the_build() {
  let mut build = TestBuild::new(css_modules(&["a", "bad", "c"]), |o| {
    o.exts(["css"]).transform(fails_on("bad.css"))
  });
  std::fs::write(&build.dest, "previous").unwrap();

  let err = build.bundle.bundle().await.unwrap_err();

  assert!(matches!(err, EngineError::Pack { ref stage, .. } if stage == COLLECTOR_STAGE));
  match extract_error(&err) {
    ExtractError::Transform { file, source } => {
      assert_eq!(file, Path::new("bad.css"));
      assert_eq!(source.message(), "malformed input");
    }
    other => panic!("unexpected error: {}", other),
  }
  // no truncated output
  assert_eq!(build.dest_content(), "previous");
  assert!(build.plugin.last_report().is_none());
}

#[tokio::test]
async fn destination_write_failure_fails_the_build() {
  let temp = TempDir::new().unwrap();
  let unwritable = temp.path().join("missing-dir").join("out.css");
  let mut bundle = Bundle::new(css_modules(&["a"]));
  let plugin = Extractify::install(&mut bundle, ExtractOptions::new(&unwritable).exts(["css"]));

  let err = bundle.bundle().await.unwrap_err();

  assert!(matches!(extract_error(&err), ExtractError::Write { path, .. } if path == &unwritable));
  assert!(!unwritable.exists());
  assert!(plugin.last_report().is_none());
}

#[tokio::test]
async fn many_files_all_contribute() {
  let names: Vec<String> = (0..64).map(|i| format!("m{:02}", i)).collect();
  let refs: Vec<&str> = names.iter().map(String::as_str).collect();
  let mut build = TestBuild::new(css_modules(&refs), |o| o.exts(["css"]).transform(Builtin::Upper.factory()));

  build.bundle.bundle().await.unwrap();

  let expected: Vec<String> = names.iter().map(|n| n.to_uppercase()).collect();
  assert_eq!(build.dest_content(), expected.join("\n"));
}

#[cfg(unix)]
#[tokio::test]
async fn shell_command_transforms() {
  use extractify_lib::transform::CmdStage;

  let cmd = CmdStage::factory("tr a-z A-Z".to_string(), Default::default(), None);
  let mut build = TestBuild::new(css_modules(&["a", "b"]), |o| o.exts(["css"]).transform(cmd));

  build.bundle.bundle().await.unwrap();

  assert_eq!(build.dest_content(), "A\nB");
}
