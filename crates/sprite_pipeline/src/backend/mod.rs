//! Backend abstraction for the rendering engine
//!
//! The pipeline never manipulates a 3D scene itself. Everything that touches
//! scene state goes through [`RenderBackend`], implemented by whatever engine
//! actually loads, lights and rasterizes the models.
//!
//! Engines of this kind keep a single "currently open scene" as global state.
//! Here that state is made explicit: [`RenderBackend::load_scene`] hands out a
//! [`SceneSession`] that every scene call must present, and
//! [`RenderBackend::return_to_top_level`] ends it. A backend rejects a session
//! that is no longer the open one.

pub mod headless;

pub use headless::{BackendStats, HeadlessBackend};

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::rig::{CameraSpec, LightSpec};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend errors
#[derive(Error, Debug)]
pub enum BackendError {
    /// Scene could not be loaded
    #[error("Failed to load scene '{path}': {reason}")]
    Load {
        /// Scene file
        path: PathBuf,
        /// Backend specific cause
        reason: String,
    },

    /// Scene could not be saved
    #[error("Failed to save scene to '{path}': {reason}")]
    Save {
        /// Target file
        path: PathBuf,
        /// Backend specific cause
        reason: String,
    },

    /// Image could not be rendered or written
    #[error("Failed to render '{path}': {reason}")]
    Render {
        /// Target image
        path: PathBuf,
        /// Backend specific cause
        reason: String,
    },

    /// Scene graph manipulation failed
    #[error("Scene error: {0}")]
    Scene(String),

    /// A session was used after the backend moved on
    #[error("Scene session {0} is no longer open")]
    StaleSession(u64),
}

/// Handle to the scene a backend currently has open
#[derive(Debug, PartialEq, Eq)]
pub struct SceneSession {
    id: u64,
    source: PathBuf,
}

impl SceneSession {
    /// Create a session handle; called by backends when a scene is opened
    pub fn new(id: u64, source: impl Into<PathBuf>) -> Self {
        Self {
            id,
            source: source.into(),
        }
    }

    /// Backend-assigned session number
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Scene file the session was opened from
    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Rendering engine driven by the pipeline
///
/// All calls are synchronous. Backends are assumed non-reentrant: the pipeline
/// holds at most one session and drives it from a single thread.
pub trait RenderBackend {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Open the scene stored at `path` as an isolated working scene
    ///
    /// Any previously open session becomes stale.
    fn load_scene(&mut self, path: &Path) -> BackendResult<SceneSession>;

    /// Persist the working scene to `path`
    fn save_scene(&mut self, session: &SceneSession, path: &Path) -> BackendResult<()>;

    /// Add an orthographic camera to the named group, creating the group if needed
    fn create_camera(&mut self, session: &SceneSession, group: &str, camera: &CameraSpec) -> BackendResult<()>;

    /// Add a light to the named group, creating the group if needed
    fn create_light(&mut self, session: &SceneSession, group: &str, light: &LightSpec) -> BackendResult<()>;

    /// Remove the named group and every object in it; a missing group is not an error
    fn purge_named_group(&mut self, session: &SceneSession, group: &str) -> BackendResult<()>;

    /// Make the camera called `label` the capture viewpoint
    fn set_active_camera(&mut self, session: &SceneSession, label: &str) -> BackendResult<()>;

    /// Render the active camera's view to a PNG at `path`, overwriting it
    fn render_to_file(&mut self, session: &SceneSession, path: &Path) -> BackendResult<()>;

    /// Render with a transparent background
    fn enable_transparent_background(&mut self, session: &SceneSession) -> BackendResult<()>;

    /// Close the working scene and go back to the backend's top-level context
    fn return_to_top_level(&mut self) -> BackendResult<()>;
}
