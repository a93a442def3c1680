//! Side-channel extraction of module content.
//!
//! [`Extractify`] plugs into a [`Bundler`] at three points:
//! - a per-module transform that captures in-scope content, runs it through
//!   the configured transform chain on a background task, and leaves an empty
//!   module in the bundle
//! - a collector at the head of the packing pipeline that records the order
//!   in which in-scope modules are packed
//! - a reset hook that gives every rebuild a fresh [`BuildCycle`] and collector
//!
//! When packing ends the collector waits for the cycle's extractions, joins
//! their outputs with newlines in pack order, and overwrites the destination.
//! Files recorded in the pack order without an extracted output contribute
//! nothing.

mod collector;
mod cycle;
mod interceptor;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::info;

use crate::engine::{Bundler, PackPipeline, TransformOptions};
use crate::filter::ExtensionFilter;
use crate::transform::{StageError, TransformFactory};

pub use collector::{COLLECTOR_STAGE, Collector, FinalizeReport, SEPARATOR};
pub use cycle::BuildCycle;
pub use interceptor::Interceptor;

/// Errors raised while extracting or writing the combined output.
#[derive(Debug, Error)]
pub enum ExtractError {
  /// A file's transform chain failed.
  #[error("extraction failed for {}: {source}", file.display())]
  Transform {
    file: PathBuf,
    #[source]
    source: StageError,
  },

  /// A file's extracted output was not valid UTF-8.
  #[error("extracted output for {} is not valid UTF-8", file.display())]
  Encoding { file: PathBuf },

  /// The destination could not be written.
  #[error("failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// An extraction task panicked or was cancelled.
  #[error("extraction task failed: {0}")]
  TaskFailed(String),
}

/// Plugin configuration.
#[derive(Clone)]
pub struct ExtractOptions {
  /// File receiving the combined output.
  pub dest: PathBuf,
  /// Extensions of files to extract.
  pub exts: Vec<String>,
  /// Transform chain applied to each extracted file, first to last.
  pub transforms: Vec<TransformFactory>,
  /// Intercept every module rather than only local ones.
  pub global: bool,
}

impl std::fmt::Debug for ExtractOptions {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExtractOptions")
      .field("dest", &self.dest)
      .field("exts", &self.exts)
      .field("transforms", &self.transforms.len())
      .field("global", &self.global)
      .finish()
  }
}

impl ExtractOptions {
  pub fn new(dest: impl Into<PathBuf>) -> Self {
    Self {
      dest: dest.into(),
      exts: Vec::new(),
      transforms: Vec::new(),
      global: false,
    }
  }

  pub fn exts<I, S>(mut self, exts: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.exts = exts.into_iter().map(Into::into).collect();
    self
  }

  pub fn transform(mut self, factory: TransformFactory) -> Self {
    self.transforms.push(factory);
    self
  }

  pub fn global(mut self, global: bool) -> Self {
    self.global = global;
    self
  }
}

/// State shared by the interceptor, the reset hook, and every collector.
struct Shared {
  filter: ExtensionFilter,
  transforms: Vec<TransformFactory>,
  dest: PathBuf,
  global: bool,
  generation: AtomicU64,
  current: Mutex<Arc<BuildCycle>>,
  last_report: Mutex<Option<FinalizeReport>>,
}

impl Shared {
  fn current_cycle(&self) -> Arc<BuildCycle> {
    Arc::clone(&self.current.lock().unwrap_or_else(PoisonError::into_inner))
  }

  /// Replace the current cycle with a fresh one and return it.
  fn begin_cycle(&self) -> Arc<BuildCycle> {
    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
    let cycle = Arc::new(BuildCycle::new(generation));
    *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&cycle);
    cycle
  }

  fn record_report(&self, report: FinalizeReport) {
    *self.last_report.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
  }
}

/// Start a new build cycle and put its collector at the head of `pipeline`.
fn install_collector(shared: &Arc<Shared>, pipeline: &mut PackPipeline) {
  let cycle = shared.begin_cycle();
  info!(generation = cycle.generation(), "injecting collector into the pack pipeline");
  pipeline.unshift(Box::new(Collector::new(Arc::clone(shared), cycle)));
}

/// Handle to an installed extraction plugin.
#[derive(Clone)]
pub struct Extractify {
  shared: Arc<Shared>,
}

impl std::fmt::Debug for Extractify {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Extractify")
      .field("dest", &self.shared.dest)
      .field("filter", &self.shared.filter)
      .field("transforms", &self.shared.transforms.len())
      .field("global", &self.shared.global)
      .field("generation", &self.generation())
      .finish()
  }
}

impl Extractify {
  /// Register the plugin's hooks with `bundler`.
  ///
  /// The collector for the first build is installed immediately; later
  /// builds get theirs from the reset hook.
  pub fn install<B: Bundler + ?Sized>(bundler: &mut B, options: ExtractOptions) -> Self {
    let ExtractOptions {
      dest,
      exts,
      transforms,
      global,
    } = options;

    let shared = Arc::new(Shared {
      filter: ExtensionFilter::new(&exts),
      transforms,
      dest,
      global,
      generation: AtomicU64::new(0),
      current: Mutex::new(Arc::new(BuildCycle::new(0))),
      last_report: Mutex::new(None),
    });

    bundler.transform(interceptor::factory(Arc::clone(&shared)), TransformOptions { global });

    let hook_shared = Arc::clone(&shared);
    bundler.on_reset(Box::new(move |pipeline: &mut PackPipeline| {
      install_collector(&hook_shared, pipeline);
    }));
    install_collector(&shared, bundler.pack_pipeline());

    Self { shared }
  }

  /// Generation of the current build cycle.
  pub fn generation(&self) -> u64 {
    self.shared.generation.load(Ordering::SeqCst)
  }

  /// The build cycle new extractions are attributed to.
  pub fn current_cycle(&self) -> Arc<BuildCycle> {
    self.shared.current_cycle()
  }

  /// Report of the most recent successful finalize.
  pub fn last_report(&self) -> Option<FinalizeReport> {
    self.shared.last_report.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}
