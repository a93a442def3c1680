//! Packing-phase stage that records module order and writes the combined
//! extraction when packing ends.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::cycle::BuildCycle;
use super::{ExtractError, Shared};
use crate::engine::{EngineError, PackFuture, PackRecord, PackStage};

/// Name of the collector in the packing pipeline.
pub const COLLECTOR_STAGE: &str = "extractify-collector";

/// Separator placed between extracted outputs.
pub const SEPARATOR: &str = "\n";

/// Outcome of one finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizeReport {
  /// Build cycle the report belongs to.
  pub generation: u64,
  pub dest: PathBuf,
  /// In-scope files that contributed, in pack order.
  pub files: Vec<PathBuf>,
  /// In-scope files seen while packing that had no extracted output.
  pub missing: Vec<PathBuf>,
  /// Size of the written destination in bytes.
  pub bytes: usize,
}

/// Observes packed records for one build cycle.
///
/// Records are always forwarded unchanged. In-scope paths are appended to the
/// pack order list, duplicates included.
pub struct Collector {
  shared: Arc<Shared>,
  cycle: Arc<BuildCycle>,
  order: Vec<PathBuf>,
}

impl std::fmt::Debug for Collector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Collector")
      .field("generation", &self.cycle.generation())
      .field("order", &self.order)
      .finish()
  }
}

impl Collector {
  pub(super) fn new(shared: Arc<Shared>, cycle: Arc<BuildCycle>) -> Self {
    Self {
      shared,
      cycle,
      order: Vec::new(),
    }
  }

  async fn finalize(&mut self) -> Result<FinalizeReport, ExtractError> {
    let extracted = self.cycle.wait().await?;
    debug!(extracted, recorded = self.order.len(), "combining files");

    let (outputs, missing) = self.cycle.store().collect_in_order(&self.order);
    let missing: Vec<PathBuf> = missing.into_iter().map(PathBuf::from).collect();
    let files: Vec<PathBuf> = self
      .order
      .iter()
      .filter(|file| !missing.contains(*file))
      .cloned()
      .collect();
    let combined = outputs.join(SEPARATOR);

    let dest = self.shared.dest.clone();
    info!(dest = %dest.display(), files = files.len(), missing = missing.len(), "writing extracted output");
    tokio::fs::write(&dest, combined.as_bytes())
      .await
      .map_err(|source| ExtractError::Write {
        path: dest.clone(),
        source,
      })?;

    let report = FinalizeReport {
      generation: self.cycle.generation(),
      dest,
      files,
      missing,
      bytes: combined.len(),
    };
    self.shared.record_report(report.clone());
    Ok(report)
  }
}

impl PackStage for Collector {
  fn name(&self) -> &str {
    COLLECTOR_STAGE
  }

  fn write(&mut self, record: PackRecord) -> Result<Vec<PackRecord>, EngineError> {
    if self.shared.filter.should_process(&record.file) {
      self.order.push(record.file.clone());
    }
    Ok(vec![record])
  }

  fn finish(&mut self) -> PackFuture<'_> {
    Box::pin(async move {
      self
        .finalize()
        .await
        .map_err(|e| EngineError::pack(COLLECTOR_STAGE, e))?;
      Ok(vec![])
    })
  }
}
