//! The packing phase: an ordered list of stages over packed records.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use super::types::{EngineError, PackRecord};

/// Future returned by [`PackStage::finish`].
pub type PackFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<PackRecord>, EngineError>> + Send + 'a>>;

/// One stage of the packing phase.
pub trait PackStage: Send {
  /// Name used in logs and errors.
  fn name(&self) -> &str;

  /// Observe a record, returning the records to forward downstream.
  fn write(&mut self, record: PackRecord) -> Result<Vec<PackRecord>, EngineError>;

  /// Called once after the last record. The packing phase does not complete
  /// until this future resolves.
  fn finish(&mut self) -> PackFuture<'_>;
}

/// Ordered packing stages; records enter at the head.
#[derive(Default)]
pub struct PackPipeline {
  stages: Vec<Box<dyn PackStage>>,
}

impl fmt::Debug for PackPipeline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PackPipeline").field("stages", &self.names()).finish()
  }
}

impl PackPipeline {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a stage at the head of the pipeline.
  pub fn unshift(&mut self, stage: Box<dyn PackStage>) {
    debug!(stage = stage.name(), "inserting pack stage at head");
    self.stages.insert(0, stage);
  }

  /// Append a stage at the tail of the pipeline.
  pub fn push(&mut self, stage: Box<dyn PackStage>) {
    self.stages.push(stage);
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  pub fn names(&self) -> Vec<&str> {
    self.stages.iter().map(|s| s.name()).collect()
  }

  /// Run `records` through every stage in order.
  ///
  /// Each stage sees every record its predecessor forwarded, then finishes
  /// before the next stage finishes.
  pub async fn run(&mut self, records: Vec<PackRecord>) -> Result<Vec<PackRecord>, EngineError> {
    let mut flowing = records;
    for stage in &mut self.stages {
      let mut forwarded = Vec::with_capacity(flowing.len());
      for record in flowing {
        forwarded.extend(stage.write(record)?);
      }
      forwarded.extend(stage.finish().await?);
      debug!(stage = stage.name(), records = forwarded.len(), "pack stage finished");
      flowing = forwarded;
    }
    Ok(flowing)
  }
}
