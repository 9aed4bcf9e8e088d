//! # Vehicle pose
//!
//! Planar pose of the vehicle plus its altitude above the ground plane.
//! Planning assumes level flight at constant altitude, so attitude reduces to
//! a single yaw angle about the world Z axis.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose of the vehicle in the world frame.
///
/// Yaw is the angle to the world +X axis in radians, positive anticlockwise.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct VehiclePose {
    /// Position in the world XY plane
    pub position_m: Point2<f64>,

    /// Heading angle in radians
    pub yaw_rad: f64,

    /// Height above the ground plane, must be positive for the camera
    /// projection to be defined
    pub altitude_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehiclePose {
    pub fn new(x_m: f64, y_m: f64, yaw_rad: f64, altitude_m: f64) -> Self {
        Self {
            position_m: Point2::new(x_m, y_m),
            yaw_rad,
            altitude_m,
        }
    }

    /// Bearing from this pose to the target point, in radians to the world +X
    /// axis.
    pub fn bearing_to(&self, target: &Point2<f64>) -> f64 {
        let diff = target - self.position_m;
        diff.y.atan2(diff.x)
    }
}
