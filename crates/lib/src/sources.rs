//! Module discovery from disk.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::ProjectConfig;
use crate::engine::Module;

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("failed to read module {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to walk {}: {source}", root.display())]
  Walk {
    root: PathBuf,
    #[source]
    source: walkdir::Error,
  },
}

/// Returns true if any component of `path` (relative to `root` when possible)
/// is one of the `external` directory names.
pub fn is_external(path: &Path, root: &Path, external: &[String]) -> bool {
  let relative = path.strip_prefix(root).unwrap_or(path);
  relative.components().any(|component| match component {
    Component::Normal(name) => external.iter().any(|ext| name == ext.as_str()),
    _ => false,
  })
}

fn canonical(path: &Path) -> PathBuf {
  dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// List module paths in build order.
///
/// Explicit `modules` win; otherwise every file under `root` is listed in
/// file-name order. The destination file and every path in `exclude` are
/// never listed. Paths are compared in canonical form.
pub fn module_paths(config: &ProjectConfig, exclude: &[PathBuf]) -> Result<Vec<PathBuf>, SourceError> {
  if !config.modules.is_empty() {
    return Ok(config.modules.clone());
  }

  let skipped: HashSet<PathBuf> = std::iter::once(config.dest.as_path())
    .chain(exclude.iter().map(PathBuf::as_path))
    .map(canonical)
    .collect();
  let mut paths = Vec::new();
  for entry in WalkDir::new(&config.root).sort_by_file_name() {
    let entry = entry.map_err(|source| SourceError::Walk {
      root: config.root.clone(),
      source,
    })?;
    if !entry.file_type().is_file() {
      continue;
    }
    if skipped.contains(&canonical(entry.path())) {
      debug!(path = %entry.path().display(), "skipping excluded file");
      continue;
    }
    paths.push(entry.into_path());
  }
  Ok(paths)
}

/// Read every module named by `config`, leaving out `exclude`.
pub fn collect_modules(config: &ProjectConfig, exclude: &[PathBuf]) -> Result<Vec<Module>, SourceError> {
  let paths = module_paths(config, exclude)?;
  debug!(count = paths.len(), root = %config.root.display(), "discovered modules");

  paths
    .into_iter()
    .map(|path| {
      let bytes = std::fs::read(&path).map_err(|source| SourceError::Read {
        path: path.clone(),
        source,
      })?;
      let local = !is_external(&path, &config.root, &config.external);
      Ok(Module {
        source: String::from_utf8_lossy(&bytes).into_owned(),
        file: path,
        local,
      })
    })
    .collect()
}
