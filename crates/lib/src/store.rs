//! Per-cycle storage of extracted outputs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Maps a file path to the extracted output produced for it.
///
/// Every extraction task writes only its own key; the collector reads the
/// store once per build cycle.
#[derive(Debug, Default)]
pub struct ResultStore {
  entries: Mutex<HashMap<PathBuf, String>>,
}

impl ResultStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, String>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Record the output for `file`, returning the previous entry if the same
  /// file was extracted twice in this cycle.
  pub fn insert(&self, file: PathBuf, output: String) -> Option<String> {
    self.lock().insert(file, output)
  }

  pub fn get(&self, file: &Path) -> Option<String> {
    self.lock().get(file).cloned()
  }

  pub fn contains(&self, file: &Path) -> bool {
    self.lock().contains_key(file)
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Look up every path in order, skipping paths with no entry.
  ///
  /// Returns the outputs found and the paths that had none.
  pub fn collect_in_order<'a>(&self, order: &'a [PathBuf]) -> (Vec<String>, Vec<&'a Path>) {
    let entries = self.lock();
    let mut found = Vec::with_capacity(order.len());
    let mut missing = Vec::new();
    for file in order {
      match entries.get(file) {
        Some(output) => found.push(output.clone()),
        None => missing.push(file.as_path()),
      }
    }
    (found, missing)
  }
}
