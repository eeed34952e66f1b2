//! # Orthographic Capture Camera
//!
//! Camera description handed to the rendering backend. The rig only ever uses
//! orthographic cameras: sprites must keep the same pixel size for an object
//! no matter how far it sits from the camera.
//!
//! ## Conventions
//! - World space is right-handed and Z-up
//! - A camera with zero rotation looks straight down (-Z) with +Y as its up
//! - `ortho_scale` is the world-space extent covered by the larger image side

use crate::foundation::math::{EulerRotation, Mat4, Mat4Ext, Point3, Rotation3, Vec3};

/// Orthographic camera placed in a backend scene
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSpec {
    /// Object name inside the scene, e.g. `Camera east`
    pub label: String,

    /// Camera position in world space
    pub position: Vec3,

    /// Camera orientation
    pub rotation: EulerRotation,

    /// World units covered by the larger image side
    pub ortho_scale: f32,
}

impl CameraSpec {
    /// Create an orthographic camera
    pub fn orthographic(label: impl Into<String>, position: Vec3, rotation: EulerRotation, ortho_scale: f32) -> Self {
        Self {
            label: label.into(),
            position,
            rotation,
            ortho_scale,
        }
    }

    fn rotation_matrix(&self) -> Rotation3<f32> {
        self.rotation.to_rotation()
    }

    /// Viewing direction in world space
    pub fn forward(&self) -> Vec3 {
        self.rotation_matrix() * Vec3::new(0.0, 0.0, -1.0)
    }

    /// Image-up direction in world space
    pub fn up(&self) -> Vec3 {
        self.rotation_matrix() * Vec3::new(0.0, 1.0, 0.0)
    }

    /// World-to-camera transformation
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::camera_view(self.position, &self.rotation_matrix())
    }

    /// Project a world-space point to normalized device coordinates
    ///
    /// Both axes span `[-1, 1]` across the image; `aspect` is width / height.
    /// Depth is ignored since orthographic sprites never clip in this pipeline.
    pub fn project(&self, point: Vec3, aspect: f32) -> (f32, f32) {
        let eye = self.view_matrix().transform_point(&Point3::from(point));
        let half = self.ortho_scale * 0.5;

        if aspect >= 1.0 {
            (eye.x / half, eye.y * aspect / half)
        } else {
            (eye.x / (half * aspect), eye.y / half)
        }
    }
}
