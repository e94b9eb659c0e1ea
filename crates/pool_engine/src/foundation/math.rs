//! Math utilities and types
//!
//! Provides the math types the pooling layer hands to its host when an
//! instance is placed in the world.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// World position and orientation applied to an instance when it is spawned
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Position in world space
    pub position: Vec3,

    /// Orientation in world space
    pub rotation: Quat,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl Placement {
    /// Placement at the world origin with no rotation
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a placement with only a position
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a placement with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Create a placement from a position and Euler angles (radians)
    pub fn from_euler(position: Vec3, roll: f32, pitch: f32, yaw: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_euler_angles(roll, pitch, yaw),
        }
    }

    /// Replace the rotation (builder style)
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Direction the placement faces, using -Z as forward
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::new(0.0, 0.0, -1.0)
    }
}
