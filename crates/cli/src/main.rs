mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use extractify_lib::config::DEFAULT_CONFIG_FILE;

use crate::output::OutputFormat;

/// extractify - extract side-channel content from bundled modules
#[derive(Parser)]
#[command(name = "extractify")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Bundle the project's modules and write the extracted output
  Build {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Also write the rendered bundle to this path
    #[arg(long)]
    bundle: Option<PathBuf>,
  },

  /// List discovered modules and whether they would be extracted
  Files {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
  },

  /// Write a starter configuration into the current directory
  Init {
    /// Overwrite an existing configuration
    #[arg(short, long)]
    force: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build { config, bundle } => cmd::cmd_build(&config, bundle.as_deref(), cli.verbose, cli.output),
    Commands::Files { config } => cmd::cmd_files(&config, cli.output),
    Commands::Init { force } => cmd::cmd_init(force),
  }
}
