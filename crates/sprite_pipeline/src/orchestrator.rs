//! # Render Orchestrator
//!
//! Drives the whole pipeline: enumerate the catalog, decide per model whether
//! its sprites are stale, render the stale ones through the backend and publish
//! every category once all of its models are done.
//!
//! ## Per-model state machine
//!
//! ```text
//! Pending ──fresh──▶ Skipped
//!    │
//!    └──stale──▶ Loading ──▶ RigApplied ──▶ Captured ──▶ Persisted
//! ```
//!
//! ## Output replacement
//!
//! The four images are rendered into a hidden staging directory next to the
//! output directory. Only when all four exist is the old output removed and the
//! staging directory renamed into its place, so a failed render never leaves a
//! half-written output directory behind. A staging directory left over from a
//! crashed run is discarded before rendering.
//!
//! ## Failure policy
//!
//! Backend and filesystem errors abort the run; nothing is retried. Publish
//! conflicts only affect the model they occur on and are collected in the
//! [`RunReport`].

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::backend::{RenderBackend, SceneSession};
use crate::catalog::{CatalogWalker, ModelCategory, ModelEntry, ModelId};
use crate::core::config::PipelineConfig;
use crate::error::{FilesystemError, PipelineResult};
use crate::foundation::time::Stopwatch;
use crate::publish::{classify, ConflictError, EntryKind, PublishError, PublishLinker, PublishOutcome};
use crate::rig::{ViewRig, STATION_COUNT};
use crate::staleness::{Freshness, StalenessOracle};

/// Progress of one model through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Not looked at yet
    Pending,
    /// Output is fresh; nothing was done
    Skipped,
    /// Backend is loading the source artifact
    Loading,
    /// Cameras and lights are in place
    RigApplied,
    /// All views are rendered and swapped into the output directory
    Captured,
    /// Backend saved the working scene back to the source artifact
    Persisted,
}

/// Knobs for a single run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Render every model regardless of staleness
    pub force: bool,
    /// Only report what would be rendered; touch neither backend nor filesystem
    pub dry_run: bool,
    /// Process these categories instead of the configured ones
    pub categories: Option<Vec<ModelCategory>>,
}

/// What happened to a model's sprites
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    /// Output was fresh
    Skipped(Freshness),
    /// Output would have been rendered (dry run)
    WouldRender(Freshness),
    /// Output was rendered
    Rendered {
        /// Verdict before rendering
        previous: Freshness,
        /// Time spent loading, capturing and saving
        elapsed: Duration,
    },
}

/// What happened to a model's alias
#[derive(Debug)]
pub enum PublishStatus {
    /// Publishing did not run (dry run)
    NotAttempted,
    /// The model has no output directory to publish
    NoOutput,
    /// Alias created or replaced
    Published(PublishOutcome),
    /// Real content occupies the alias path
    Conflict(ConflictError),
}

/// Result of one model
#[derive(Debug)]
pub struct ModelReport {
    /// Model paths
    pub entry: ModelEntry,
    /// Render outcome
    pub outcome: ModelOutcome,
    /// Publish outcome
    pub publish: PublishStatus,
}

/// Result of a whole run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Per-model results in processing order
    pub models: Vec<ModelReport>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl RunReport {
    /// Number of models rendered
    pub fn rendered_count(&self) -> usize {
        self.models
            .iter()
            .filter(|m| matches!(m.outcome, ModelOutcome::Rendered { .. }))
            .count()
    }

    /// Number of models skipped as fresh
    pub fn skipped_count(&self) -> usize {
        self.models
            .iter()
            .filter(|m| matches!(m.outcome, ModelOutcome::Skipped(_)))
            .count()
    }

    /// Number of models a dry run would render
    pub fn pending_count(&self) -> usize {
        self.models
            .iter()
            .filter(|m| matches!(m.outcome, ModelOutcome::WouldRender(_)))
            .count()
    }

    /// Publish conflicts encountered
    pub fn conflicts(&self) -> impl Iterator<Item = &ConflictError> {
        self.models.iter().filter_map(|m| match &m.publish {
            PublishStatus::Conflict(conflict) => Some(conflict),
            _ => None,
        })
    }

    /// Whether any publish step hit a conflict
    pub fn has_conflicts(&self) -> bool {
        self.conflicts().next().is_some()
    }

    /// Result for one model, if it was processed
    pub fn model(&self, category: &str, id: &str) -> Option<&ModelReport> {
        self.models
            .iter()
            .find(|m| m.entry.category.as_str() == category && m.entry.id.as_str() == id)
    }
}

/// Runs the sprite pipeline against one backend
pub struct RenderOrchestrator<B: RenderBackend> {
    backend: B,
    walker: CatalogWalker,
    oracle: StalenessOracle,
    rig: ViewRig,
    linker: PublishLinker,
    categories: Vec<ModelCategory>,
}

impl<B: RenderBackend> RenderOrchestrator<B> {
    /// Create an orchestrator for the project at `root`
    ///
    /// `config` is expected to have passed [`PipelineConfig::validate`].
    pub fn new(config: &PipelineConfig, root: &Path, backend: B) -> Self {
        Self {
            backend,
            walker: CatalogWalker::new(config.layout.resolve(root)),
            oracle: StalenessOracle::new(config.staleness.threshold()),
            rig: ViewRig::new(&config.rig),
            linker: PublishLinker::new(),
            categories: config.categories.iter().map(ModelCategory::new).collect(),
        }
    }

    /// The backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Give the backend back
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// The catalog walker
    pub fn walker(&self) -> &CatalogWalker {
        &self.walker
    }

    /// The staleness oracle
    pub fn oracle(&self) -> &StalenessOracle {
        &self.oracle
    }

    /// Run the pipeline over every category
    ///
    /// All categories are enumerated before anything is rendered, so a missing
    /// catalog directory fails the run up front.
    pub fn run(&mut self, options: &RunOptions) -> PipelineResult<RunReport> {
        let stopwatch = Stopwatch::start_new();
        let categories = options.categories.clone().unwrap_or_else(|| self.categories.clone());

        let mut plan = Vec::with_capacity(categories.len());
        for category in categories {
            let models = self.walker.list_models(&category)?;
            plan.push((category, models));
        }

        log::info!(
            "Processing {} categories with the {} backend{}",
            plan.len(),
            self.backend.name(),
            if options.dry_run { " (dry run)" } else { "" }
        );

        let mut report = RunReport::default();
        for (category, models) in &plan {
            self.run_category(category, models, options, &mut report)?;
        }

        report.elapsed = stopwatch.elapsed();
        log::info!(
            "Run finished in {:.2}s: {} rendered, {} skipped, {} pending, {} publish conflicts",
            report.elapsed.as_secs_f64(),
            report.rendered_count(),
            report.skipped_count(),
            report.pending_count(),
            report.conflicts().count()
        );
        Ok(report)
    }

    /// Render and publish the given models of one category
    pub fn run_category(
        &mut self,
        category: &ModelCategory,
        models: &[ModelId],
        options: &RunOptions,
        report: &mut RunReport,
    ) -> PipelineResult<()> {
        log::info!("Category '{}': {} models", category, models.len());

        let mut outcomes = Vec::with_capacity(models.len());
        for (index, id) in models.iter().enumerate() {
            let entry = self.walker.model_entry(category, id);
            let outcome = self.process_model(&entry, options)?;
            log::info!(
                "[{}/{}] {}/{}: {}",
                index + 1,
                models.len(),
                category,
                id,
                describe(&outcome)
            );
            outcomes.push((entry, outcome));
        }

        // Publish only once every render of the category has finished
        for (entry, outcome) in outcomes {
            let publish = if options.dry_run {
                PublishStatus::NotAttempted
            } else {
                self.publish_model(&entry)?
            };
            report.models.push(ModelReport { entry, outcome, publish });
        }

        if !options.dry_run {
            self.backend.return_to_top_level()?;
        }
        Ok(())
    }

    /// Decide on one model and render it if needed
    pub fn process_model(&mut self, entry: &ModelEntry, options: &RunOptions) -> PipelineResult<ModelOutcome> {
        let verdict = self.oracle.inspect(&entry.source_artifact, &entry.output_dir)?;
        let needs_render = options.force || verdict.needs_regeneration();

        if !needs_render {
            log::info!("{}/{}: {:?} -> {:?}", entry.category, entry.id, ModelState::Pending, ModelState::Skipped);
            return Ok(ModelOutcome::Skipped(verdict));
        }
        if options.dry_run {
            return Ok(ModelOutcome::WouldRender(verdict));
        }

        let stopwatch = Stopwatch::start_new();
        self.render_model(entry)?;
        Ok(ModelOutcome::Rendered {
            previous: verdict,
            elapsed: stopwatch.elapsed(),
        })
    }

    fn render_model(&mut self, entry: &ModelEntry) -> PipelineResult<()> {
        let mut state = ModelState::Pending;
        let result = self.drive_render(entry, &mut state);
        if let Err(error) = &result {
            log::error!("{}/{} failed after state {:?}: {}", entry.category, entry.id, state, error);
        }
        result
    }

    fn drive_render(&mut self, entry: &ModelEntry, state: &mut ModelState) -> PipelineResult<()> {
        advance(entry, state, ModelState::Loading);
        let session = self.backend.load_scene(&entry.source_artifact)?;

        self.rig.apply(&mut self.backend, &session)?;
        self.backend.enable_transparent_background(&session)?;
        advance(entry, state, ModelState::RigApplied);

        if let Err(error) = self.capture(&session, entry) {
            discard_staging(&entry.staging_dir);
            return Err(error);
        }
        swap_into_place(&entry.staging_dir, &entry.output_dir)?;
        advance(entry, state, ModelState::Captured);

        self.backend.save_scene(&session, &entry.source_artifact)?;
        advance(entry, state, ModelState::Persisted);
        Ok(())
    }

    fn capture(&mut self, session: &SceneSession, entry: &ModelEntry) -> PipelineResult<()> {
        let staging = &entry.staging_dir;
        if staging.exists() {
            log::warn!("Removing leftover staging directory '{}'", staging.display());
            fs::remove_dir_all(staging).map_err(|e| FilesystemError::io("remove directory", staging, e))?;
        }
        fs::create_dir_all(staging).map_err(|e| FilesystemError::io("create directory", staging, e))?;

        for station in ViewRig::stations() {
            self.backend
                .set_active_camera(session, &ViewRig::camera_label(station.direction))?;
            self.backend
                .render_to_file(session, &staging.join(station.direction.image_file_name()))?;
        }

        log::debug!("{}/{}: {} views captured", entry.category, entry.id, STATION_COUNT);
        Ok(())
    }

    fn publish_model(&self, entry: &ModelEntry) -> PipelineResult<PublishStatus> {
        if !entry.output_dir.is_dir() {
            log::warn!("{}/{}: no sprites at '{}', not publishing", entry.category, entry.id, entry.output_dir.display());
            return Ok(PublishStatus::NoOutput);
        }

        match self.linker.publish(&entry.output_dir, &entry.alias_path) {
            Ok(outcome) => Ok(PublishStatus::Published(outcome)),
            Err(PublishError::Conflict(conflict)) => {
                log::warn!("{}/{}: {}", entry.category, entry.id, conflict);
                Ok(PublishStatus::Conflict(conflict))
            }
            Err(PublishError::Filesystem(error)) => Err(error.into()),
        }
    }
}

fn advance(entry: &ModelEntry, state: &mut ModelState, next: ModelState) {
    log::info!("{}/{}: {:?} -> {:?}", entry.category, entry.id, state, next);
    *state = next;
}

fn describe(outcome: &ModelOutcome) -> String {
    match outcome {
        ModelOutcome::Skipped(verdict) => format!("{}, skipped", verdict.label()),
        ModelOutcome::WouldRender(verdict) => format!("{}, would render", verdict.label()),
        ModelOutcome::Rendered { previous, elapsed } => {
            format!("{}, rendered in {:.2}s", previous.label(), elapsed.as_secs_f64())
        }
    }
}

/// Replace `output` with the fully rendered `staging` directory
fn swap_into_place(staging: &Path, output: &Path) -> Result<(), FilesystemError> {
    match classify(output)? {
        EntryKind::Absent => {}
        EntryKind::Directory => {
            fs::remove_dir_all(output).map_err(|e| FilesystemError::io("remove directory", output, e))?;
        }
        EntryKind::Alias | EntryKind::File => {
            fs::remove_file(output).map_err(|e| FilesystemError::io("remove", output, e))?;
        }
    }
    fs::rename(staging, output).map_err(|e| FilesystemError::io("move staging directory to", output, e))
}

fn discard_staging(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_dir_all(staging) {
            log::warn!("Failed to remove staging directory '{}': {}", staging.display(), e);
        }
    }
}
