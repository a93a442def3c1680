//! Implementation of the `extractify files` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use extractify_lib::ExtensionFilter;
use extractify_lib::config::ProjectConfig;
use extractify_lib::sources::{is_external, module_paths};

use crate::output::{OutputFormat, print_json, print_stat, symbols};

#[derive(Debug, Serialize)]
struct FileEntry {
  file: PathBuf,
  local: bool,
  extract: bool,
}

/// List discovered modules without building.
///
/// A module is marked for extraction when its extension is configured and it
/// is local, or `global` is set.
pub fn cmd_files(config_path: &Path, output: OutputFormat) -> Result<()> {
  let config =
    ProjectConfig::load(config_path).with_context(|| format!("Failed to load config: {}", config_path.display()))?;
  let filter = ExtensionFilter::new(&config.exts);

  let entries: Vec<FileEntry> = module_paths(&config, &[config_path.to_path_buf()])
    .context("Failed to discover modules")?
    .into_iter()
    .map(|file| {
      let local = !is_external(&file, &config.root, &config.external);
      let extract = filter.should_process(&file) && (local || config.global);
      FileEntry { file, local, extract }
    })
    .collect();

  if output.is_json() {
    return print_json(&entries);
  }

  for entry in &entries {
    let marker = if entry.extract {
      symbols::EXTRACT.if_supports_color(Stream::Stdout, |s| s.green()).to_string()
    } else {
      symbols::SKIP.if_supports_color(Stream::Stdout, |s| s.dimmed()).to_string()
    };
    let location = if entry.local { "" } else { " (external)" };
    println!("  {} {}{}", marker, entry.file.display(), location);
  }

  println!();
  print_stat("Modules", &entries.len().to_string());
  print_stat("To extract", &entries.iter().filter(|e| e.extract).count().to_string());

  Ok(())
}
