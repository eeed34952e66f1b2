//! # Headless Backend
//!
//! In-process implementation of [`RenderBackend`]. It keeps a real scene graph
//! (named groups of cameras and lights) and writes real PNG files, but does not
//! rasterize the model itself: each image shows the world axes as seen through
//! the active camera, which is enough to verify the rig and the output layout
//! end to end without an external engine.
//!
//! Saving a scene rewrites the source file's bytes unchanged, so the source
//! artifact's modification time moves forward exactly like it does with a
//! real engine.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use slotmap::{new_key_type, SlotMap};

use super::{BackendError, BackendResult, RenderBackend, SceneSession};
use crate::core::config::RenderConfig;
use crate::foundation::math::Vec3;
use crate::rig::{CameraSpec, LightSpec};

new_key_type! {
    /// Key of an object in the headless scene graph
    pub struct ObjectKey;
}

/// Object stored in the headless scene graph
#[derive(Debug, Clone)]
enum SceneObject {
    Camera(CameraSpec),
    Light(LightSpec),
}

impl SceneObject {
    fn label(&self) -> &str {
        match self {
            Self::Camera(camera) => &camera.label,
            Self::Light(light) => &light.label,
        }
    }
}

/// The working scene of an open session
#[derive(Debug)]
struct OpenScene {
    session_id: u64,
    source: PathBuf,
    objects: SlotMap<ObjectKey, SceneObject>,
    groups: BTreeMap<String, Vec<ObjectKey>>,
    active_camera: Option<ObjectKey>,
    transparent: bool,
}

impl OpenScene {
    fn new(session_id: u64, source: PathBuf) -> Self {
        Self {
            session_id,
            source,
            objects: SlotMap::with_key(),
            groups: BTreeMap::new(),
            active_camera: None,
            transparent: false,
        }
    }

    fn insert(&mut self, group: &str, object: SceneObject) -> BackendResult<()> {
        if self.objects.values().any(|existing| existing.label() == object.label()) {
            return Err(BackendError::Scene(format!("an object named '{}' already exists", object.label())));
        }
        let key = self.objects.insert(object);
        self.groups.entry(group.to_string()).or_default().push(key);
        Ok(())
    }

    fn find_camera(&self, label: &str) -> Option<ObjectKey> {
        self.objects
            .iter()
            .find(|(_, object)| matches!(object, SceneObject::Camera(camera) if camera.label == label))
            .map(|(key, _)| key)
    }

    fn total_light_intensity(&self) -> f32 {
        self.objects
            .values()
            .filter_map(|object| match object {
                SceneObject::Light(light) => Some(light.intensity),
                SceneObject::Camera(_) => None,
            })
            .sum()
    }
}

/// Counters of what the backend has been asked to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Scenes opened
    pub loads: usize,
    /// Scenes saved
    pub saves: usize,
    /// Images written
    pub renders: usize,
    /// Returns to the top-level context
    pub top_level_returns: usize,
}

/// Software backend writing axis-gizmo sprites
#[derive(Debug)]
pub struct HeadlessBackend {
    config: RenderConfig,
    next_session: u64,
    scene: Option<OpenScene>,
    stats: BackendStats,
}

impl HeadlessBackend {
    /// Create a backend rendering at the configured resolution
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            next_session: 1,
            scene: None,
            stats: BackendStats::default(),
        }
    }

    /// What the backend has done so far
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Whether a working scene is open
    pub fn has_open_scene(&self) -> bool {
        self.scene.is_some()
    }

    /// Number of objects in the named group of the open scene
    pub fn group_len(&self, group: &str) -> usize {
        self.scene
            .as_ref()
            .and_then(|scene| scene.groups.get(group))
            .map_or(0, Vec::len)
    }

    /// Number of objects in the open scene
    pub fn object_count(&self) -> usize {
        self.scene.as_ref().map_or(0, |scene| scene.objects.len())
    }

    /// Label of the active camera of the open scene
    pub fn active_camera(&self) -> Option<&str> {
        let scene = self.scene.as_ref()?;
        let key = scene.active_camera?;
        scene.objects.get(key).map(SceneObject::label)
    }

    /// Whether the open scene renders with a transparent background
    pub fn is_transparent(&self) -> bool {
        self.scene.as_ref().is_some_and(|scene| scene.transparent)
    }

    fn scene_mut(&mut self, session: &SceneSession) -> BackendResult<&mut OpenScene> {
        match self.scene.as_mut() {
            Some(scene) if scene.session_id == session.id() => Ok(scene),
            _ => Err(BackendError::StaleSession(session.id())),
        }
    }

    fn scene(&self, session: &SceneSession) -> BackendResult<&OpenScene> {
        match self.scene.as_ref() {
            Some(scene) if scene.session_id == session.id() => Ok(scene),
            _ => Err(BackendError::StaleSession(session.id())),
        }
    }

    fn draw(&self, scene: &OpenScene, camera: &CameraSpec) -> RgbaImage {
        let (width, height) = (self.config.width, self.config.height);
        let background = if scene.transparent {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([48, 48, 48, 255])
        };
        let mut image = RgbaImage::from_pixel(width, height, background);

        let aspect = width as f32 / height as f32;
        let exposure = scene.total_light_intensity().clamp(0.25, 1.0);
        let axis_length = camera.ortho_scale * 0.25;
        let axes = [
            (Vec3::x(), [255.0, 64.0, 64.0]),
            (Vec3::y(), [64.0, 255.0, 64.0]),
            (Vec3::z(), [64.0, 128.0, 255.0]),
        ];

        let origin = camera.project(Vec3::zeros(), aspect);
        for (axis, color) in axes {
            let tip = camera.project(axis * axis_length, aspect);
            let color = Rgba([
                (color[0] * exposure) as u8,
                (color[1] * exposure) as u8,
                (color[2] * exposure) as u8,
                255,
            ]);
            draw_line(&mut image, origin, tip, color);
        }

        image
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

/// Plot a line between two NDC points, clipped to the image
fn draw_line(image: &mut RgbaImage, from: (f32, f32), to: (f32, f32), color: Rgba<u8>) {
    let (width, height) = image.dimensions();
    let to_pixel = |(x, y): (f32, f32)| {
        (
            (x + 1.0) * 0.5 * width as f32,
            (1.0 - y) * 0.5 * height as f32,
        )
    };
    let (x0, y0) = to_pixel(from);
    let (x1, y1) = to_pixel(to);

    let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as u32;
    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let x = x0 + (x1 - x0) * t;
        let y = y0 + (y1 - y0) * t;
        if x >= 0.0 && y >= 0.0 && (x as u32) < width && (y as u32) < height {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn load_scene(&mut self, path: &Path) -> BackendResult<SceneSession> {
        let metadata = fs::metadata(path).map_err(|e| BackendError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !metadata.is_file() {
            return Err(BackendError::Load {
                path: path.to_path_buf(),
                reason: "not a file".to_string(),
            });
        }

        let id = self.next_session;
        self.next_session += 1;
        if let Some(previous) = self.scene.replace(OpenScene::new(id, path.to_path_buf())) {
            log::trace!("Session {} replaced by session {}", previous.session_id, id);
        }
        self.stats.loads += 1;

        log::trace!("Session {} opened '{}'", id, path.display());
        Ok(SceneSession::new(id, path))
    }

    fn save_scene(&mut self, session: &SceneSession, path: &Path) -> BackendResult<()> {
        let source = self.scene(session)?.source.clone();
        let save_error = |e: std::io::Error| BackendError::Save {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        // Scene content is opaque here; writing the bytes back refreshes the file like a real save
        let bytes = fs::read(&source).map_err(save_error)?;
        fs::write(path, bytes).map_err(save_error)?;
        self.stats.saves += 1;

        log::trace!("Session {} saved to '{}'", session.id(), path.display());
        Ok(())
    }

    fn create_camera(&mut self, session: &SceneSession, group: &str, camera: &CameraSpec) -> BackendResult<()> {
        log::trace!("Creating camera '{}' in group '{}'", camera.label, group);
        self.scene_mut(session)?.insert(group, SceneObject::Camera(camera.clone()))
    }

    fn create_light(&mut self, session: &SceneSession, group: &str, light: &LightSpec) -> BackendResult<()> {
        log::trace!("Creating light '{}' in group '{}'", light.label, group);
        self.scene_mut(session)?.insert(group, SceneObject::Light(light.clone()))
    }

    fn purge_named_group(&mut self, session: &SceneSession, group: &str) -> BackendResult<()> {
        let scene = self.scene_mut(session)?;
        let Some(keys) = scene.groups.remove(group) else {
            return Ok(());
        };

        for key in &keys {
            scene.objects.remove(*key);
            if scene.active_camera == Some(*key) {
                scene.active_camera = None;
            }
        }
        log::trace!("Purged group '{}' ({} objects)", group, keys.len());
        Ok(())
    }

    fn set_active_camera(&mut self, session: &SceneSession, label: &str) -> BackendResult<()> {
        let scene = self.scene_mut(session)?;
        let key = scene
            .find_camera(label)
            .ok_or_else(|| BackendError::Scene(format!("no camera named '{}'", label)))?;
        scene.active_camera = Some(key);
        Ok(())
    }

    fn render_to_file(&mut self, session: &SceneSession, path: &Path) -> BackendResult<()> {
        let scene = self.scene(session)?;
        let render_error = |reason: String| BackendError::Render {
            path: path.to_path_buf(),
            reason,
        };

        let camera = match scene.active_camera.and_then(|key| scene.objects.get(key)) {
            Some(SceneObject::Camera(camera)) => camera,
            _ => return Err(render_error("no active camera".to_string())),
        };

        let image = self.draw(scene, camera);
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| render_error(e.to_string()))?;
        self.stats.renders += 1;

        log::trace!("Rendered '{}'", path.display());
        Ok(())
    }

    fn enable_transparent_background(&mut self, session: &SceneSession) -> BackendResult<()> {
        self.scene_mut(session)?.transparent = true;
        Ok(())
    }

    fn return_to_top_level(&mut self) -> BackendResult<()> {
        if let Some(scene) = self.scene.take() {
            log::trace!("Session {} closed", scene.session_id);
        }
        self.stats.top_level_returns += 1;
        Ok(())
    }
}
