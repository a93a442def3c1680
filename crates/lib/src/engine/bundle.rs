//! Reference build engine over an ordered list of modules.

use tracing::{debug, info};

use super::pipeline::PackPipeline;
use super::types::{BundleOutput, EngineError, Module, PackRecord, TransformOptions};
use super::{Bundler, ResetHook};
use crate::transform::{StageError, TransformFactory, build_chain, run_stage};

/// An in-process bundler.
///
/// Modules are transformed and packed in the order they were given. Every
/// call to [`Bundle::bundle`] after the first is a rebuild: the packing
/// pipeline is replaced and the reset hooks run before any module is
/// transformed.
#[derive(Default)]
pub struct Bundle {
  modules: Vec<Module>,
  transforms: Vec<(TransformFactory, TransformOptions)>,
  pipeline: PackPipeline,
  reset_hooks: Vec<ResetHook>,
  builds: usize,
}

impl std::fmt::Debug for Bundle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Bundle")
      .field("modules", &self.modules.len())
      .field("transforms", &self.transforms.len())
      .field("pipeline", &self.pipeline)
      .field("reset_hooks", &self.reset_hooks.len())
      .field("builds", &self.builds)
      .finish()
  }
}

impl Bundle {
  pub fn new(modules: Vec<Module>) -> Self {
    Self {
      modules,
      ..Self::default()
    }
  }

  pub fn modules(&self) -> &[Module] {
    &self.modules
  }

  /// Replace the module list, e.g. after files changed on disk.
  pub fn set_modules(&mut self, modules: Vec<Module>) {
    self.modules = modules;
  }

  pub fn add_module(&mut self, module: Module) {
    self.modules.push(module);
  }

  /// Number of builds started so far.
  pub fn builds(&self) -> usize {
    self.builds
  }

  /// Start a new build cycle: fresh packing pipeline, then every reset hook
  /// in registration order.
  pub fn reset(&mut self) {
    debug!(hooks = self.reset_hooks.len(), "resetting pipeline");
    self.pipeline = PackPipeline::new();
    for hook in &self.reset_hooks {
      hook(&mut self.pipeline);
    }
  }

  /// Transform every module and run the packing phase.
  pub async fn bundle(&mut self) -> Result<BundleOutput, EngineError> {
    if self.builds > 0 {
      self.reset();
    }
    self.builds += 1;

    info!(build = self.builds, modules = self.modules.len(), "bundling");

    let mut records = Vec::with_capacity(self.modules.len());
    for (id, module) in self.modules.iter().enumerate() {
      let source = self.transform_module(module)?;
      records.push(PackRecord {
        id,
        file: module.file.clone(),
        source,
      });
    }

    let records = self.pipeline.run(records).await?;

    info!(build = self.builds, records = records.len(), "bundle complete");

    Ok(BundleOutput { records })
  }

  /// Run a module's source through every transform that applies to it.
  fn transform_module(&self, module: &Module) -> Result<String, EngineError> {
    let applicable: Vec<TransformFactory> = self
      .transforms
      .iter()
      .filter(|(_, options)| options.global || module.local)
      .map(|(factory, _)| factory.clone())
      .collect();

    if applicable.is_empty() {
      return Ok(module.source.clone());
    }

    let fail = |source: StageError| EngineError::Transform {
      file: module.file.clone(),
      source,
    };

    let stage = build_chain(&module.file, &applicable);
    let output = run_stage(stage, module.source.clone().into_bytes()).map_err(fail)?;
    String::from_utf8(output).map_err(|e| fail(StageError::with_source("transformed module is not valid UTF-8", e)))
  }
}

impl Bundler for Bundle {
  fn transform(&mut self, factory: TransformFactory, options: TransformOptions) {
    self.transforms.push((factory, options));
  }

  fn pack_pipeline(&mut self) -> &mut PackPipeline {
    &mut self.pipeline
  }

  fn on_reset(&mut self, hook: ResetHook) {
    self.reset_hooks.push(hook);
  }
}
