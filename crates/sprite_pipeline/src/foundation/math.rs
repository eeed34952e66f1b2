//! Math utilities and types
//!
//! Provides the small set of 3D math types the capture rig and the headless
//! backend need. World space follows the authoring tool convention: right-handed,
//! Z-up. Cameras look down their local -Z axis with local +Y as up.

pub use nalgebra::{Matrix4, Rotation3, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Euler rotation in radians, applied in X, Y, Z order.
///
/// `x` tilts the camera down from straight-down (pitch), `y` rolls it and
/// `z` turns it around the world up axis (yaw).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerRotation {
    /// Rotation around the X axis in radians
    pub x: f32,
    /// Rotation around the Y axis in radians
    pub y: f32,
    /// Rotation around the Z axis in radians
    pub z: f32,
}

impl EulerRotation {
    /// Create a rotation from radians
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Create a rotation from degrees
    pub fn from_degrees(x: f32, y: f32, z: f32) -> Self {
        Self::new(utils::deg_to_rad(x), utils::deg_to_rad(y), utils::deg_to_rad(z))
    }

    /// Rotation matrix equivalent to `Rz * Ry * Rx`
    pub fn to_rotation(&self) -> Rotation3<f32> {
        Rotation3::from_euler_angles(self.x, self.y, self.z)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with camera helpers
pub trait Mat4Ext {
    /// Build a world-to-camera matrix from a camera pose
    fn camera_view(position: Vec3, rotation: &Rotation3<f32>) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn camera_view(position: Vec3, rotation: &Rotation3<f32>) -> Mat4 {
        // Inverse of (translation * rotation): rotate back, then untranslate
        let inverse_rotation = rotation.inverse().to_homogeneous();
        let inverse_translation = Mat4::new_translation(&(-position));
        inverse_rotation * inverse_translation
    }
}
