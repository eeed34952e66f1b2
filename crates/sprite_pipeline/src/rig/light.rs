//! Light description handed to the rendering backend

use crate::foundation::math::Vec3;

/// Light types the rig can place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Sun light: parallel rays, position only matters to the authoring tool
    Sun,
}

/// Light placed in a backend scene
#[derive(Debug, Clone, PartialEq)]
pub struct LightSpec {
    /// Object name inside the scene, e.g. `Sun east`
    pub label: String,
    /// Light type
    pub kind: LightKind,
    /// Light position in world space
    pub position: Vec3,
    /// Light intensity
    pub intensity: f32,
}

impl LightSpec {
    /// Create a sun light
    pub fn sun(label: impl Into<String>, position: Vec3, intensity: f32) -> Self {
        Self {
            label: label.into(),
            kind: LightKind::Sun,
            position,
            intensity,
        }
    }
}
