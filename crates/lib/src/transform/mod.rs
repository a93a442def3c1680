//! Transform stages and chain composition.
//!
//! A [`Stage`] is a push-based transducer: it consumes chunks, emits zero or
//! more chunks per input, and may emit trailing chunks when its input ends.
//! A [`TransformFactory`] produces a fresh stage for each file so that stages
//! may keep per-file state.
//!
//! # Submodules
//!
//! - [`stages`] - identity, closure-backed, and built-in stages
//! - [`cmd`] - stage that pipes content through a shell command

pub mod cmd;
pub mod stages;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

pub use cmd::CmdStage;
pub use stages::{Builtin, Identity, map_stage};

/// A unit of content flowing between stages.
pub type Chunk = Vec<u8>;

/// Creates the stage instance used for one file.
pub type TransformFactory = Arc<dyn Fn(&Path) -> Box<dyn Stage> + Send + Sync>;

/// Wrap a closure as a [`TransformFactory`].
pub fn factory<F>(f: F) -> TransformFactory
where
  F: Fn(&Path) -> Box<dyn Stage> + Send + Sync + 'static,
{
  Arc::new(f)
}

/// Error raised by a stage while processing content.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StageError {
  message: String,
  #[source]
  source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StageError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      source: None,
    }
  }

  pub fn with_source(message: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self {
      message: message.into(),
      source: Some(Box::new(source)),
    }
  }

  pub fn message(&self) -> &str {
    &self.message
  }
}

/// A data-in/data-out transducer.
pub trait Stage: Send {
  /// Consume one chunk of input, returning the chunks to emit downstream.
  fn consume(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError>;

  /// Signal end of input, returning any trailing chunks.
  fn end(&mut self) -> Result<Vec<Chunk>, StageError>;
}

impl Stage for Box<dyn Stage> {
  fn consume(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
    (**self).consume(chunk)
  }

  fn end(&mut self) -> Result<Vec<Chunk>, StageError> {
    (**self).end()
  }
}

/// Linear composition of stages: the output of stage `k` is the input of
/// stage `k + 1`.
pub struct Chain {
  stages: Vec<Box<dyn Stage>>,
}

impl Chain {
  pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
    Self { stages }
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  /// Push `chunks` through every stage starting at index `from`.
  fn forward(&mut self, from: usize, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>, StageError> {
    for stage in &mut self.stages[from..] {
      let mut emitted = Vec::with_capacity(chunks.len());
      for chunk in chunks {
        emitted.extend(stage.consume(chunk)?);
      }
      chunks = emitted;
    }
    Ok(chunks)
  }
}

impl fmt::Debug for Chain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Chain").field("stages", &self.stages.len()).finish()
  }
}

impl Stage for Chain {
  fn consume(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
    self.forward(0, vec![chunk])
  }

  fn end(&mut self) -> Result<Vec<Chunk>, StageError> {
    // Stage k is ended before k + 1 so its trailing chunks still reach k + 1.
    let mut output = Vec::new();
    for idx in 0..self.stages.len() {
      let trailing = self.stages[idx].end()?;
      output.extend(self.forward(idx + 1, trailing)?);
    }
    Ok(output)
  }
}

/// Instantiate one stage per factory for `path` and link them in list order.
///
/// An empty factory list yields an [`Identity`] stage.
pub fn build_chain(path: &Path, factories: &[TransformFactory]) -> Box<dyn Stage> {
  trace!(file = %path.display(), stages = factories.len(), "building transform chain");
  let mut stages: Vec<Box<dyn Stage>> = factories.iter().map(|make| make(path)).collect();
  match stages.len() {
    0 => Box::new(Identity),
    1 => stages.remove(0),
    _ => Box::new(Chain::new(stages)),
  }
}

/// Feed `content` to `stage` as a single chunk, end it, and concatenate the
/// emitted chunks.
pub fn run_stage(mut stage: impl Stage, content: Chunk) -> Result<Chunk, StageError> {
  let mut output = Vec::new();
  for chunk in stage.consume(content)? {
    output.extend(chunk);
  }
  for chunk in stage.end()? {
    output.extend(chunk);
  }
  Ok(output)
}
