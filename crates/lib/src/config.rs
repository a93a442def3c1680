//! Project configuration loaded from `extractify.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::ExtractOptions;
use crate::transform::{Builtin, CmdStage, TransformFactory};

/// File name looked up when no configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "extractify.toml";

/// Configuration written by `extractify init`.
pub const STARTER_CONFIG: &str = r#"# Destination for the combined extracted output.
dest = "dist/extracted.css"

# Extensions of files to extract (no leading dot).
exts = ["css"]

# Also extract from modules under `external` directories.
global = false

# Directory walked for modules when `modules` is empty.
root = "src"

# Explicit module order. Takes precedence over `root`.
modules = []

# Directory names whose modules are not local.
external = ["node_modules"]

# Transforms applied to each extracted file, first to last.
[[transforms]]
builtin = "trim"

# [[transforms]]
# cmd = "tr a-z A-Z"
# env = { LANG = "C" }
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid config: {0}")]
  Invalid(String),
}

/// One entry of the `[[transforms]]` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformSpec {
  /// A built-in stage, e.g. `builtin = "trim"`.
  Builtin { builtin: Builtin },
  /// A shell command reading the file on stdin and writing the result to stdout.
  Cmd {
    cmd: String,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    shell: Option<String>,
  },
}

impl TransformSpec {
  pub fn factory(&self) -> TransformFactory {
    match self {
      TransformSpec::Builtin { builtin } => builtin.factory(),
      TransformSpec::Cmd { cmd, env, shell } => CmdStage::factory(cmd.clone(), env.clone(), shell.clone()),
    }
  }
}

fn default_root() -> PathBuf {
  PathBuf::from(".")
}

fn default_external() -> Vec<String> {
  vec!["node_modules".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
  pub dest: PathBuf,
  #[serde(default)]
  pub exts: Vec<String>,
  #[serde(default)]
  pub global: bool,
  #[serde(default = "default_root")]
  pub root: PathBuf,
  #[serde(default)]
  pub modules: Vec<PathBuf>,
  #[serde(default = "default_external")]
  pub external: Vec<String>,
  #[serde(default)]
  pub transforms: Vec<TransformSpec>,
}

impl ProjectConfig {
  /// Parse and validate configuration text. Paths are left as written.
  pub fn parse(text: &str) -> Result<Self, ConfigError> {
    let config: ProjectConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  /// Load a configuration file, resolving relative paths against its directory.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(Self::parse(&text)?.resolve(base))
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.dest.as_os_str().is_empty() {
      return Err(ConfigError::Invalid("`dest` must not be empty".to_string()));
    }
    if let Some(ext) = self.exts.iter().find(|ext| ext.trim_start_matches('.').is_empty()) {
      return Err(ConfigError::Invalid(format!("empty extension {:?} in `exts`", ext)));
    }
    Ok(())
  }

  /// Make `dest`, `root`, and `modules` relative to `base`.
  pub fn resolve(mut self, base: &Path) -> Self {
    self.dest = base.join(&self.dest);
    self.root = base.join(&self.root);
    self.modules = self.modules.iter().map(|m| base.join(m)).collect();
    self
  }

  pub fn transform_factories(&self) -> Vec<TransformFactory> {
    self.transforms.iter().map(TransformSpec::factory).collect()
  }

  pub fn to_options(&self) -> ExtractOptions {
    ExtractOptions {
      dest: self.dest.clone(),
      exts: self.exts.clone(),
      transforms: self.transform_factories(),
      global: self.global,
    }
  }
}
