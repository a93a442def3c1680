//! Per-build-cycle extraction state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, error};

use super::ExtractError;
use crate::store::ResultStore;
use crate::transform::{Chunk, Stage, StageError, run_stage};

type ExtractionSet = JoinSet<Result<(), ExtractError>>;

/// State owned by one build cycle: the extracted outputs and the extraction
/// tasks still in flight.
///
/// A new cycle is created on every reset; nothing is carried over.
#[derive(Debug)]
pub struct BuildCycle {
  generation: u64,
  store: ResultStore,
  pending: Mutex<ExtractionSet>,
}

impl BuildCycle {
  pub fn new(generation: u64) -> Self {
    Self {
      generation,
      store: ResultStore::new(),
      pending: Mutex::new(JoinSet::new()),
    }
  }

  /// Sequence number of this cycle, starting at 1 for the initial build.
  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn store(&self) -> &ResultStore {
    &self.store
  }

  /// Number of extraction tasks not yet collected by [`BuildCycle::wait`].
  pub fn pending(&self) -> usize {
    self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  /// Start extracting `file` on the blocking pool.
  ///
  /// The chain receives `content` as a single chunk; its terminal output is
  /// written to this cycle's store when the task completes.
  pub(crate) fn spawn_extraction(
    self: &Arc<Self>,
    file: PathBuf,
    chain: Box<dyn Stage>,
    content: Chunk,
  ) -> Result<(), StageError> {
    let handle =
      Handle::try_current().map_err(|e| StageError::with_source("extraction requires a running tokio runtime", e))?;

    let cycle = Arc::clone(self);
    self
      .pending
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .spawn_blocking_on(move || cycle.extract(file, chain, content), &handle);
    Ok(())
  }

  fn extract(&self, file: PathBuf, chain: Box<dyn Stage>, content: Chunk) -> Result<(), ExtractError> {
    debug!(file = %file.display(), bytes = content.len(), "applying transformations");

    let output = run_stage(chain, content).map_err(|source| ExtractError::Transform {
      file: file.clone(),
      source,
    })?;
    let output = String::from_utf8(output).map_err(|_| ExtractError::Encoding { file: file.clone() })?;

    debug!(file = %file.display(), bytes = output.len(), "transformations applied");

    if self.store.insert(file.clone(), output).is_some() {
      debug!(file = %file.display(), "replaced earlier extraction in this cycle");
    }
    Ok(())
  }

  fn take_pending(&self) -> ExtractionSet {
    std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
  }

  /// Wait for every extraction started so far.
  ///
  /// All tasks are drained even after a failure; the first failure is
  /// returned. On success, returns the number of extractions that completed.
  pub async fn wait(&self) -> Result<usize, ExtractError> {
    let mut set = self.take_pending();
    let mut completed = 0;
    let mut first_error = None;

    while let Some(joined) = set.join_next().await {
      match joined {
        Ok(Ok(())) => completed += 1,
        Ok(Err(e)) => {
          error!(error = %e, "extraction failed");
          first_error.get_or_insert(e);
        }
        Err(e) => {
          error!(error = %e, "extraction task panicked");
          first_error.get_or_insert(ExtractError::TaskFailed(e.to_string()));
        }
      }
    }

    match first_error {
      Some(e) => Err(e),
      None => Ok(completed),
    }
  }
}
