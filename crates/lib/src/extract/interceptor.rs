//! Per-module transform that diverts in-scope content into the extraction
//! side channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::Shared;
use super::cycle::BuildCycle;
use crate::transform::{self, Chunk, Identity, Stage, StageError, TransformFactory, build_chain};

/// Buffers a module's content, hands it to the file's transform chain on a
/// background task, and emits an empty module in its place.
pub struct Interceptor {
  file: PathBuf,
  chain: Option<Box<dyn Stage>>,
  cycle: Arc<BuildCycle>,
  buffer: Chunk,
}

impl std::fmt::Debug for Interceptor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Interceptor")
      .field("file", &self.file)
      .field("generation", &self.cycle.generation())
      .field("buffered", &self.buffer.len())
      .finish()
  }
}

impl Interceptor {
  pub fn new(file: &Path, chain: Box<dyn Stage>, cycle: Arc<BuildCycle>) -> Self {
    Self {
      file: file.to_path_buf(),
      chain: Some(chain),
      cycle,
      buffer: Vec::new(),
    }
  }
}

impl Stage for Interceptor {
  fn consume(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
    self.buffer.extend(chunk);
    Ok(vec![])
  }

  fn end(&mut self) -> Result<Vec<Chunk>, StageError> {
    let chain = self
      .chain
      .take()
      .ok_or_else(|| StageError::new(format!("{} was already intercepted", self.file.display())))?;
    let content = std::mem::take(&mut self.buffer);

    debug!(file = %self.file.display(), "stripping content");
    self.cycle.spawn_extraction(self.file.clone(), chain, content)?;

    Ok(vec![Vec::new()])
  }
}

/// The factory registered with the build engine.
///
/// In-scope files get an [`Interceptor`] bound to the current build cycle;
/// everything else passes through untouched.
pub(super) fn factory(shared: Arc<Shared>) -> TransformFactory {
  transform::factory(move |file| {
    if !shared.filter.should_process(file) {
      return Box::new(Identity);
    }
    debug!(file = %file.display(), transforms = shared.transforms.len(), "extracting");
    let chain = build_chain(file, &shared.transforms);
    Box::new(Interceptor::new(file, chain, shared.current_cycle()))
  })
}
