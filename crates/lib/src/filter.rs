//! Extension-based scoping of module files.
//!
//! A file is in scope when the text after the final `.` of its file name is a
//! member of the configured extension set. Matching is case-sensitive and a
//! file without an extension is never in scope.

use std::collections::BTreeSet;
use std::path::Path;

/// Decides which files are handed to the extraction pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
  exts: BTreeSet<String>,
}

impl ExtensionFilter {
  /// Create a filter from extension strings.
  ///
  /// A single leading `.` is tolerated and stripped, so `".css"` and `"css"`
  /// select the same files. Empty entries are ignored.
  pub fn new<I, S>(exts: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let exts = exts
      .into_iter()
      .map(|ext| {
        let ext = ext.as_ref();
        ext.strip_prefix('.').unwrap_or(ext).to_string()
      })
      .filter(|ext| !ext.is_empty())
      .collect();
    Self { exts }
  }

  /// Returns true if the file at `path` should be extracted.
  pub fn should_process(&self, path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some(ext) if !ext.is_empty() => self.exts.contains(ext),
      _ => false,
    }
  }

  /// The configured extensions, sorted.
  pub fn extensions(&self) -> impl Iterator<Item = &str> {
    self.exts.iter().map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.exts.is_empty()
  }
}
