//! # Pipeline Configuration
//!
//! All tunables of the sprite pipeline live here: where the catalog, the
//! rendered sprites and the published static tree are, which categories to
//! walk, the rig's shared camera/light parameters, the staleness threshold and
//! the headless render resolution.
//!
//! Every section implements `Default` with the values the production catalog
//! uses, and every struct is `#[serde(default)]` so a config file only needs to
//! name the values it overrides:
//!
//! ```toml
//! categories = ["items"]
//!
//! [layout]
//! static_dir = "../server/static"
//!
//! [staleness]
//! threshold_secs = 30.0
//! ```

use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use crate::config::{Config, ConfigError};

/// Categories rendered when no configuration overrides them
pub const DEFAULT_CATEGORIES: [&str; 3] = ["structures", "items", "organisms"];

/// Seconds a source artifact must be newer than its sprites to count as edited
pub const DEFAULT_STALENESS_THRESHOLD_SECS: f64 = 10.0;

/// Orthographic scale shared by every rig camera
pub const DEFAULT_ORTHO_SCALE: f32 = 15.0;

/// Intensity shared by every rig light
pub const DEFAULT_LIGHT_INTENSITY: f32 = 1.0;

/// # Logging Configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// # Layout Configuration
///
/// Directory names of the three trees the pipeline touches. Relative paths are
/// resolved against the project root handed to [`LayoutConfig::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Catalog of source artifacts, `<models_dir>/<category>/<id>/<id>.<ext>`
    pub models_dir: PathBuf,
    /// Rendered output, `<sprites_dir>/<category>/<id>/<label>.png`
    pub sprites_dir: PathBuf,
    /// Static asset tree of the web server; aliases land in `img/sprites` below it
    pub static_dir: PathBuf,
    /// File extension of source artifacts, without the dot
    pub source_extension: String,
}

impl LayoutConfig {
    /// Resolve every directory against `root`
    pub fn resolve(&self, root: &Path) -> ResolvedLayout {
        let absolute = |dir: &Path| {
            if dir.is_absolute() {
                dir.to_path_buf()
            } else {
                root.join(dir)
            }
        };

        ResolvedLayout {
            models_root: absolute(&self.models_dir),
            sprites_root: absolute(&self.sprites_dir),
            publish_root: absolute(&self.static_dir).join("img").join("sprites"),
            source_extension: self.source_extension.clone(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            sprites_dir: PathBuf::from("sprites"),
            static_dir: PathBuf::from("static"),
            source_extension: "blend".to_string(),
        }
    }
}

/// Layout with all directories resolved against a project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    /// Root of the source catalog
    pub models_root: PathBuf,
    /// Root of the rendered sprites
    pub sprites_root: PathBuf,
    /// Directory that receives `<category>/<id>` aliases
    pub publish_root: PathBuf,
    /// Source artifact extension, without the dot
    pub source_extension: String,
}

/// # Rig Configuration
///
/// Parameters shared by all four capture stations. Station poses themselves are
/// fixed constants of the rig.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RigConfig {
    /// Orthographic scale of every camera (world units across the larger image side)
    pub ortho_scale: f32,
    /// Intensity of every sun light
    pub light_intensity: f32,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            ortho_scale: DEFAULT_ORTHO_SCALE,
            light_intensity: DEFAULT_LIGHT_INTENSITY,
        }
    }
}

/// # Staleness Configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StalenessConfig {
    /// Minimum lead of the source artifact over its sprites, in seconds
    pub threshold_secs: f64,
}

impl StalenessConfig {
    /// Threshold as a duration
    ///
    /// Only meaningful after [`PipelineConfig::validate`] accepted the value.
    pub fn threshold(&self) -> Duration {
        Duration::from_secs_f64(self.threshold_secs.max(0.0))
    }
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            threshold_secs: DEFAULT_STALENESS_THRESHOLD_SECS,
        }
    }
}

/// # Render Configuration
///
/// Output resolution used by the headless backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
        }
    }
}

/// # Complete Pipeline Configuration
///
/// Top-level configuration that encompasses every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model categories, processed in this order
    pub categories: Vec<String>,
    /// Logging defaults
    pub logging: LoggingConfig,
    /// Directory layout
    pub layout: LayoutConfig,
    /// Capture rig parameters
    pub rig: RigConfig,
    /// Staleness decision parameters
    pub staleness: StalenessConfig,
    /// Headless render parameters
    pub render: RenderConfig,
}

impl PipelineConfig {
    /// Create a configuration with production defaults
    pub fn new() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| (*c).to_string()).collect(),
            logging: LoggingConfig::default(),
            layout: LayoutConfig::default(),
            rig: RigConfig::default(),
            staleness: StalenessConfig::default(),
            render: RenderConfig::default(),
        }
    }

    /// Replace the category list
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Set the staleness threshold in seconds
    pub fn with_threshold_secs(mut self, seconds: f64) -> Self {
        self.staleness.threshold_secs = seconds;
        self
    }

    /// Set the headless render resolution
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.render = RenderConfig { width, height };
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("at least one model category is required".to_string()));
        }

        for (index, category) in self.categories.iter().enumerate() {
            if !is_plain_name(category) {
                return Err(ConfigError::Invalid(format!("category '{}' is not a plain directory name", category)));
            }
            if self.categories[..index].contains(category) {
                return Err(ConfigError::Invalid(format!("category '{}' is listed twice", category)));
            }
        }

        let extension = &self.layout.source_extension;
        if extension.is_empty() || extension.starts_with('.') || extension.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!("source extension '{}' must be a bare extension", extension)));
        }

        if !(self.rig.ortho_scale.is_finite() && self.rig.ortho_scale > 0.0) {
            return Err(ConfigError::Invalid("orthographic scale must be positive".to_string()));
        }

        if !(self.rig.light_intensity.is_finite() && self.rig.light_intensity >= 0.0) {
            return Err(ConfigError::Invalid("light intensity must not be negative".to_string()));
        }

        let threshold = self.staleness.threshold_secs;
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!("staleness threshold {} is not a non-negative number of seconds", threshold)));
        }

        if self.render.width == 0 || self.render.height == 0 {
            return Err(ConfigError::Invalid("render resolution must be non-zero".to_string()));
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for PipelineConfig {}

/// A name usable as a single path component
pub(crate) fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
}
