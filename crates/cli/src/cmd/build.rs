//! Implementation of the `extractify build` command.
//!
//! Loads the project configuration, discovers modules, runs one build with the
//! extraction plugin installed, and reports what was written.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use tracing::info;

use extractify_lib::Extractify;
use extractify_lib::config::ProjectConfig;
use extractify_lib::engine::Bundle;
use extractify_lib::sources::collect_modules;

use crate::output::{OutputFormat, format_bytes, print_json, print_stat, print_success, print_warning, symbols};

/// Execute the build command.
///
/// The destination's parent directory is created if needed. With `bundle`,
/// the rendered bundle (extracted modules emptied) is written there as well.
/// The config file and the bundle output are never picked up as modules.
pub fn cmd_build(config_path: &Path, bundle_path: Option<&Path>, verbose: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let config =
    ProjectConfig::load(config_path).with_context(|| format!("Failed to load config: {}", config_path.display()))?;
  let mut exclude = vec![config_path.to_path_buf()];
  exclude.extend(bundle_path.map(Path::to_path_buf));
  let modules = collect_modules(&config, &exclude).context("Failed to discover modules")?;
  info!(modules = modules.len(), dest = %config.dest.display(), "starting build");

  if let Some(parent) = config.dest.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
  }

  let mut bundle = Bundle::new(modules);
  let plugin = Extractify::install(&mut bundle, config.to_options());

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(bundle.bundle()).context("Build failed")?;
  let report = plugin
    .last_report()
    .context("Build finished without writing extracted output")?;

  if let Some(path) = bundle_path {
    fs::write(path, result.render()).with_context(|| format!("Failed to write bundle: {}", path.display()))?;
  }

  if output.is_json() {
    return print_json(&report);
  }

  let elapsed = Duration::from_millis(start.elapsed().as_millis() as u64);

  println!();
  print_success("Build complete!");
  print_stat("Destination", &report.dest.display().to_string());
  print_stat("Modules", &result.records.len().to_string());
  print_stat("Files extracted", &report.files.len().to_string());
  print_stat("Size", &format_bytes(report.bytes as u64));
  if let Some(path) = bundle_path {
    print_stat("Bundle", &path.display().to_string());
  }
  print_stat("Elapsed", &humantime::format_duration(elapsed).to_string());

  if verbose {
    println!();
    for file in &report.files {
      println!(
        "  {} {}",
        symbols::EXTRACT.if_supports_color(Stream::Stdout, |s| s.green()),
        file.display()
      );
    }
  }

  if !report.missing.is_empty() {
    println!();
    print_warning(&format!("{} file(s) had no extracted output:", report.missing.len()));
    for file in &report.missing {
      eprintln!("  {} {}", symbols::SKIP, file.display());
    }
  }

  Ok(())
}
