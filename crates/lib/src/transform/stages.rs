//! Identity, closure-backed, and built-in stages.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Chunk, Stage, StageError, TransformFactory, factory};

/// Passes every chunk through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Stage for Identity {
  fn consume(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
    Ok(vec![chunk])
  }

  fn end(&mut self) -> Result<Vec<Chunk>, StageError> {
    Ok(vec![])
  }
}

type MapFn = dyn FnMut(&Path, Chunk) -> Result<Chunk, StageError> + Send;

/// Buffers the whole input and maps it once at end of input.
pub struct MapStage {
  file: PathBuf,
  buffer: Chunk,
  f: Box<MapFn>,
}

impl fmt::Debug for MapStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MapStage")
      .field("file", &self.file)
      .field("buffered", &self.buffer.len())
      .finish()
  }
}

impl MapStage {
  pub fn new<F>(file: &Path, f: F) -> Self
  where
    F: FnMut(&Path, Chunk) -> Result<Chunk, StageError> + Send + 'static,
  {
    Self {
      file: file.to_path_buf(),
      buffer: Vec::new(),
      f: Box::new(f),
    }
  }
}

impl Stage for MapStage {
  fn consume(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
    self.buffer.extend(chunk);
    Ok(vec![])
  }

  fn end(&mut self) -> Result<Vec<Chunk>, StageError> {
    let content = std::mem::take(&mut self.buffer);
    let mapped = (self.f)(&self.file, content)?;
    Ok(vec![mapped])
  }
}

/// Boxed [`MapStage`] with no file context; the path is supplied at call time.
///
/// Useful for ad-hoc factories: `factory(|_| map_stage(|path, content| ...))`.
pub fn map_stage<F>(f: F) -> Box<dyn Stage>
where
  F: FnMut(&Path, Chunk) -> Result<Chunk, StageError> + Send + 'static,
{
  Box::new(MapStage::new(Path::new(""), f))
}

/// Stages available by name from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Builtin {
  /// Content unchanged.
  Identity,
  /// Leading and trailing whitespace removed.
  Trim,
  /// Uppercased.
  Upper,
  /// Lowercased.
  Lower,
  /// Characters in reverse order.
  Reverse,
  /// Prefixed with a `/* <file> */` comment line.
  Banner,
}

impl Builtin {
  pub fn as_str(self) -> &'static str {
    match self {
      Builtin::Identity => "identity",
      Builtin::Trim => "trim",
      Builtin::Upper => "upper",
      Builtin::Lower => "lower",
      Builtin::Reverse => "reverse",
      Builtin::Banner => "banner",
    }
  }

  /// Apply the transformation to a whole file's content.
  pub fn apply(self, file: &Path, content: Chunk) -> Result<Chunk, StageError> {
    if self == Builtin::Identity {
      return Ok(content);
    }
    let text = String::from_utf8(content)
      .map_err(|e| StageError::with_source(format!("{}: content is not valid UTF-8", self.as_str()), e))?;
    let out = match self {
      Builtin::Identity => text,
      Builtin::Trim => text.trim().to_string(),
      Builtin::Upper => text.to_uppercase(),
      Builtin::Lower => text.to_lowercase(),
      Builtin::Reverse => text.chars().rev().collect(),
      Builtin::Banner => format!("/* {} */\n{}", file.display(), text),
    };
    Ok(out.into_bytes())
  }

  /// A factory producing a fresh stage of this kind for each file.
  pub fn factory(self) -> TransformFactory {
    factory(move |file| {
      if self == Builtin::Identity {
        return Box::new(Identity);
      }
      Box::new(MapStage::new(file, move |file, content| self.apply(file, content)))
    })
  }
}

impl fmt::Display for Builtin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
