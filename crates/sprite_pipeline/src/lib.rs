//! # Sprite Pipeline
//!
//! Incremental renderer that turns a catalog of 3D models into four-view
//! isometric sprite sets and publishes them to a web server's static tree.
//!
//! ## Features
//!
//! - **Incremental**: only models whose source artifact changed since the last
//!   render are rendered again
//! - **Fixed rig**: four orthographic cameras with matching sun lights
//! - **Atomic output**: a failed render never leaves half a sprite set behind
//! - **Safe publishing**: aliases are replaced, real content never is
//! - **Pluggable backend**: any engine implementing [`backend::RenderBackend`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sprite_pipeline::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::load_from_file("sprites.toml")?;
//!     config.validate()?;
//!
//!     let backend = HeadlessBackend::new(config.render.clone());
//!     let mut orchestrator = RenderOrchestrator::new(&config, std::path::Path::new("."), backend);
//!     let report = orchestrator.run(&RunOptions::default())?;
//!     println!("{} rendered, {} skipped", report.rendered_count(), report.skipped_count());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc, clippy::must_use_candidate)]

// Configuration
pub mod config;
pub mod core;

// Shared utilities
pub mod error;
pub mod foundation;

// Pipeline stages
pub mod backend;
pub mod catalog;
pub mod orchestrator;
pub mod publish;
pub mod rig;
pub mod staleness;

pub use error::{PipelineError, PipelineResult};

/// Common imports for pipeline users
pub mod prelude {
    pub use crate::{
        backend::{BackendError, HeadlessBackend, RenderBackend, SceneSession},
        catalog::{CatalogWalker, ModelCategory, ModelEntry, ModelId},
        config::{Config, ConfigError},
        core::config::PipelineConfig,
        error::{FilesystemError, PipelineError, PipelineResult},
        foundation::time::Stopwatch,
        orchestrator::{ModelOutcome, PublishStatus, RenderOrchestrator, RunOptions, RunReport},
        publish::{ConflictError, PublishLinker, PublishOutcome},
        rig::{CardinalDirection, ViewRig},
        staleness::{Freshness, StalenessOracle},
    };
}
