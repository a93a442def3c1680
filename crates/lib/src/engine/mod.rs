//! Build engine hook points and the in-process reference engine.
//!
//! Plugins integrate with a build engine through three hook points, captured
//! by the [`Bundler`] trait:
//! - per-module transform registration
//! - the packing-phase pipeline, open to insertion at its head
//! - a reset notification fired before every rebuild
//!
//! [`Bundle`] implements these over an ordered list of in-memory modules.

mod bundle;
mod pipeline;
mod types;

pub use bundle::Bundle;
pub use pipeline::{PackFuture, PackPipeline, PackStage};
pub use types::{BoxError, BundleOutput, EngineError, Module, PackRecord, TransformOptions};

use crate::transform::TransformFactory;

/// Hook invoked with the fresh packing pipeline of every new build cycle.
pub type ResetHook = Box<dyn Fn(&mut PackPipeline) + Send + Sync>;

/// The hook points a build engine exposes to plugins.
pub trait Bundler {
  /// Register a per-module transform.
  ///
  /// Local modules always pass through it; other modules only when
  /// `options.global` is set.
  fn transform(&mut self, factory: TransformFactory, options: TransformOptions);

  /// The packing pipeline of the current build cycle.
  fn pack_pipeline(&mut self) -> &mut PackPipeline;

  /// Register a hook to run whenever the engine resets for a rebuild.
  fn on_reset(&mut self, hook: ResetHook);
}
