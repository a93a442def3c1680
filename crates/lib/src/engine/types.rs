//! Types shared between the build engine and its plugins.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::transform::StageError;

/// Boxed error produced by a packing stage.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A module in the build graph, in build order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
  /// Path identifying the module.
  pub file: PathBuf,
  /// Original module content.
  pub source: String,
  /// Whether the module belongs to the project itself rather than an
  /// external or vendored location.
  pub local: bool,
}

impl Module {
  pub fn local(file: impl Into<PathBuf>, source: impl Into<String>) -> Self {
    Self {
      file: file.into(),
      source: source.into(),
      local: true,
    }
  }

  pub fn external(file: impl Into<PathBuf>, source: impl Into<String>) -> Self {
    Self {
      file: file.into(),
      source: source.into(),
      local: false,
    }
  }
}

/// A transformed module flowing through the packing phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackRecord {
  /// Position of the module in build order.
  pub id: usize,
  pub file: PathBuf,
  /// Module content after per-module transforms.
  pub source: String,
}

/// Options for a registered per-module transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformOptions {
  /// Apply to every module, not only local ones.
  pub global: bool,
}

/// Errors raised by the build engine.
#[derive(Debug, Error)]
pub enum EngineError {
  /// A per-module transform failed.
  #[error("transform failed for {}: {source}", file.display())]
  Transform {
    file: PathBuf,
    #[source]
    source: StageError,
  },

  /// A packing stage failed.
  #[error("pack stage '{stage}' failed: {source}")]
  Pack {
    stage: String,
    #[source]
    source: BoxError,
  },
}

impl EngineError {
  pub fn pack(stage: impl Into<String>, source: impl Into<BoxError>) -> Self {
    EngineError::Pack {
      stage: stage.into(),
      source: source.into(),
    }
  }

  /// The file this error is attributed to, if any.
  pub fn file(&self) -> Option<&Path> {
    match self {
      EngineError::Transform { file, .. } => Some(file),
      _ => None,
    }
  }
}

/// Result of a completed build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BundleOutput {
  pub records: Vec<PackRecord>,
}

impl BundleOutput {
  /// Find the packed record for `file`.
  pub fn record(&self, file: &Path) -> Option<&PackRecord> {
    self.records.iter().find(|r| r.file == file)
  }

  /// Serialize the records as a plain-text bundle.
  ///
  /// Each module is introduced by a `// <file>` line followed by its source.
  pub fn render(&self) -> String {
    let mut out = String::new();
    for record in &self.records {
      let _ = writeln!(out, "// {}", record.file.display());
      out.push_str(&record.source);
      if !record.source.ends_with('\n') {
        out.push('\n');
      }
    }
    out
  }
}
