//! Shared helpers for library integration tests.

use std::path::{Path, PathBuf};

use extractify_lib::engine::{Bundle, EngineError, Module};
use extractify_lib::transform::{StageError, TransformFactory, factory, map_stage};
use extractify_lib::{ExtractError, ExtractOptions, Extractify};
use tempfile::TempDir;

/// A bundle with the plugin installed, writing into a temporary directory.
pub struct TestBuild {
  pub temp: TempDir,
  pub dest: PathBuf,
  pub bundle: Bundle,
  pub plugin: Extractify,
}

impl TestBuild {
  /// Install the plugin for `exts` with the given options customizer.
  pub fn new(modules: Vec<Module>, configure: impl FnOnce(ExtractOptions) -> ExtractOptions) -> Self {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("extracted.css");
    let mut bundle = Bundle::new(modules);
    let plugin = Extractify::install(&mut bundle, configure(ExtractOptions::new(&dest)));
    Self {
      temp,
      dest,
      bundle,
      plugin,
    }
  }

  /// Plugin extracting `.css` files with no transforms.
  pub fn css(modules: Vec<Module>) -> Self {
    Self::new(modules, |o| o.exts(["css"]))
  }

  pub fn dest_content(&self) -> String {
    std::fs::read_to_string(&self.dest).unwrap()
  }
}

/// Local `.css` modules named `<name>.css` whose source is `name`.
pub fn css_modules(names: &[&str]) -> Vec<Module> {
  names
    .iter()
    .map(|name| Module::local(format!("{}.css", name), *name))
    .collect()
}

/// A transform that fails for files whose name ends with `bad`.
pub fn fails_on(bad: &'static str) -> TransformFactory {
  factory(move |file: &Path| {
    let fail = file.to_string_lossy().ends_with(bad);
    map_stage(move |_, content| {
      if fail {
        Err(StageError::new("malformed input"))
      } else {
        Ok(content)
      }
    })
  })
}

/// Unwrap a packing failure down to the extraction error behind it.
pub fn extract_error(err: &EngineError) -> &ExtractError {
  match err {
    EngineError::Pack { source, .. } => source
      .downcast_ref::<ExtractError>()
      .unwrap_or_else(|| panic!("pack error is not an extraction error: {}", err)),
    other => panic!("expected a pack error, got {}", other),
  }
}
