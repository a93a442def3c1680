//! Implementation of the `extractify init` command.

use std::path::Path;

use anyhow::{Context, Result, bail};
use owo_colors::{OwoColorize, Stream};

use extractify_lib::config::{DEFAULT_CONFIG_FILE, STARTER_CONFIG};

use crate::output::{print_info, print_success};

/// Write a starter `extractify.toml` into the current directory.
///
/// # Errors
///
/// Returns an error if the file already exists and `force` is not set.
pub fn cmd_init(force: bool) -> Result<()> {
  let path = Path::new(DEFAULT_CONFIG_FILE);

  if path.exists() && !force {
    bail!("{} already exists (use --force to overwrite)", path.display());
  }

  std::fs::write(path, STARTER_CONFIG).with_context(|| format!("Failed to write {}", path.display()))?;

  print_success(&format!("Wrote {}", path.display()));
  print_info(&format!(
    "Edit it, then run: {}",
    "extractify build".if_supports_color(Stream::Stdout, |s| s.cyan())
  ));

  Ok(())
}
