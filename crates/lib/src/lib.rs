//! extractify-lib: side-channel content extraction for module bundlers
//!
//! During a build, files whose extension is in scope are run through a
//! per-file transform chain and emptied in the bundle; their extracted outputs
//! are concatenated in pack order into a single destination file.
//!
//! - `filter`: which files are in scope
//! - `transform`: stages, factories and chain composition
//! - `engine`: the bundler hook points and an in-process bundler
//! - `extract`: the interceptor, collector and build cycles
//! - `config` / `sources`: project configuration and module discovery

pub mod config;
pub mod engine;
pub mod extract;
pub mod filter;
pub mod sources;
pub mod store;
pub mod transform;
pub mod util;

pub use extract::{ExtractError, ExtractOptions, Extractify, FinalizeReport};
pub use filter::ExtensionFilter;
