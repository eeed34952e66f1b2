//! # View Rig
//!
//! The fixed capture rig every model is photographed with: four orthographic
//! cameras looking down at the origin from the four diagonals, each paired with
//! a sun light at the same position.
//!
//! | label | position      | rotation (deg, X/Y/Z) |
//! |-------|---------------|-----------------------|
//! | east  | (+10,-10,+10) | (60, 0, 45)           |
//! | north | (-10,-10,+10) | (60, 0, -45)          |
//! | west  | (-10,+10,+10) | (60, 0, -135)         |
//! | south | (+10,+10,+10) | (60, 0, 135)          |
//!
//! The rig is rebuilt in the backend scene for every model. Applying it first
//! purges the `Cameras` and `Lights` groups by name, so a session that already
//! holds a rig (from an earlier application or from the saved source artifact)
//! never ends up with duplicates.

pub mod camera;
pub mod light;

pub use camera::CameraSpec;
pub use light::{LightKind, LightSpec};

use std::fmt;

use crate::backend::{BackendResult, RenderBackend, SceneSession};
use crate::core::config::RigConfig;
use crate::foundation::math::{EulerRotation, Vec3};

/// Scene group holding the rig cameras
pub const CAMERA_GROUP: &str = "Cameras";

/// Scene group holding the rig lights
pub const LIGHT_GROUP: &str = "Lights";

/// Number of capture stations
pub const STATION_COUNT: usize = 4;

/// Cardinal direction a station captures the model from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CardinalDirection {
    /// Camera at (+x, -y)
    East,
    /// Camera at (-x, -y)
    North,
    /// Camera at (-x, +y)
    West,
    /// Camera at (+x, +y)
    South,
}

impl CardinalDirection {
    /// All directions in capture order
    pub const ALL: [Self; STATION_COUNT] = [Self::East, Self::North, Self::West, Self::South];

    /// Lowercase label, also the stem of the output image name
    pub fn label(self) -> &'static str {
        match self {
            Self::East => "east",
            Self::North => "north",
            Self::West => "west",
            Self::South => "south",
        }
    }

    /// File name of the image captured from this direction
    pub fn image_file_name(self) -> String {
        format!("{}.png", self.label())
    }
}

impl fmt::Display for CardinalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Position and rotation (degrees) per direction, in `CardinalDirection::ALL` order
const STATION_POSES: [([f32; 3], [f32; 3]); STATION_COUNT] = [
    ([10.0, -10.0, 10.0], [60.0, 0.0, 45.0]),
    ([-10.0, -10.0, 10.0], [60.0, 0.0, -45.0]),
    ([-10.0, 10.0, 10.0], [60.0, 0.0, -135.0]),
    ([10.0, 10.0, 10.0], [60.0, 0.0, 135.0]),
];

/// One camera/light pose of the rig
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewStation {
    /// Direction the station captures from
    pub direction: CardinalDirection,
    /// Camera and light position
    pub position: Vec3,
    /// Camera orientation
    pub rotation: EulerRotation,
}

/// The capture rig with its shared camera and light parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRig {
    ortho_scale: f32,
    light_intensity: f32,
}

impl ViewRig {
    /// Create a rig from configuration
    pub fn new(config: &RigConfig) -> Self {
        Self {
            ortho_scale: config.ortho_scale,
            light_intensity: config.light_intensity,
        }
    }

    /// The four stations in capture order
    pub fn stations() -> [ViewStation; STATION_COUNT] {
        std::array::from_fn(|index| {
            let ([x, y, z], [rx, ry, rz]) = STATION_POSES[index];
            ViewStation {
                direction: CardinalDirection::ALL[index],
                position: Vec3::new(x, y, z),
                rotation: EulerRotation::from_degrees(rx, ry, rz),
            }
        })
    }

    /// Orthographic scale of every camera
    pub fn ortho_scale(&self) -> f32 {
        self.ortho_scale
    }

    /// Intensity of every light
    pub fn light_intensity(&self) -> f32 {
        self.light_intensity
    }

    /// Scene object name of the camera for `direction`
    pub fn camera_label(direction: CardinalDirection) -> String {
        format!("Camera {}", direction.label())
    }

    /// Scene object name of the light for `direction`
    pub fn light_label(direction: CardinalDirection) -> String {
        format!("Sun {}", direction.label())
    }

    /// Camera placed for `station`
    pub fn camera_spec(&self, station: &ViewStation) -> CameraSpec {
        CameraSpec::orthographic(
            Self::camera_label(station.direction),
            station.position,
            station.rotation,
            self.ortho_scale,
        )
    }

    /// Light placed for `station`
    pub fn light_spec(&self, station: &ViewStation) -> LightSpec {
        LightSpec::sun(Self::light_label(station.direction), station.position, self.light_intensity)
    }

    /// Purge any previous rig from the session and build it again
    pub fn apply<B>(&self, backend: &mut B, session: &SceneSession) -> BackendResult<()>
    where
        B: RenderBackend + ?Sized,
    {
        let stations = Self::stations();

        backend.purge_named_group(session, CAMERA_GROUP)?;
        for station in &stations {
            backend.create_camera(session, CAMERA_GROUP, &self.camera_spec(station))?;
        }

        backend.purge_named_group(session, LIGHT_GROUP)?;
        for station in &stations {
            backend.create_light(session, LIGHT_GROUP, &self.light_spec(station))?;
        }

        log::debug!(
            "Rig applied: {} cameras (ortho scale {}), {} lights (intensity {})",
            stations.len(),
            self.ortho_scale,
            stations.len(),
            self.light_intensity
        );
        Ok(())
    }
}

impl Default for ViewRig {
    fn default() -> Self {
        Self::new(&RigConfig::default())
    }
}
