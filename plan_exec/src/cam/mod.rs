//! # Camera model
//!
//! Projects the camera's angular frustum onto the ground plane as a function
//! of the vehicle pose and the camera mounting extrinsic.
//!
//! Frames follow the usual body convention: X forward, Y left, Z up. The
//! camera boresight is along the camera X axis, so a downward-looking camera
//! has a mounting pitch of +90 degrees.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Isometry3, Point2, Point3, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::geom::Polygon;
use crate::pose::VehiclePose;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Minimum camera height above the ground plane for the projection to be
/// considered defined, in meters.
const MIN_CAM_HEIGHT_M: f64 = 1e-6;

/// A corner ray must descend at least this fast (in Z per unit ray length)
/// to intersect the ground plane at a finite range.
const MIN_RAY_DESCENT: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Camera calibration parameters, loaded from `cam.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CamParams {
    /// Full horizontal field of view in degrees, must be in (0, 180)
    pub fov_h_deg: f64,

    /// Full vertical field of view in degrees, must be in (0, 180)
    pub fov_v_deg: f64,

    /// Position of the camera origin in the vehicle body frame
    pub offset_pos_m: [f64; 3],

    /// Mounting rotation of the camera in the body frame as roll, pitch, yaw
    /// in degrees. `[0, 90, 0]` points the boresight straight down.
    pub offset_rpy_deg: [f64; 3],
}

/// The camera model used to compute ground footprints.
#[derive(Debug, Clone)]
pub struct CamModel {
    /// Camera pose in the vehicle body frame
    extrinsic: Isometry3<f64>,

    /// Tangents of the half-angle fields of view
    tan_half_fov_h: f64,
    tan_half_fov_v: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("Field of view angles must lie in (0, 180) degrees, got ({0}, {1})")]
    InvalidFov(f64, f64),

    #[error("Camera is at or below the ground plane (height {0} m)")]
    CameraBelowGround(f64),

    #[error("A frustum corner ray does not descend towards the ground plane")]
    RayNotDescending,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamModel {
    /// Build a camera model from calibration parameters.
    pub fn new(params: &CamParams) -> Result<Self, ProjectionError> {
        if params.fov_h_deg <= 0.0
            || params.fov_h_deg >= 180.0
            || params.fov_v_deg <= 0.0
            || params.fov_v_deg >= 180.0
        {
            return Err(ProjectionError::InvalidFov(
                params.fov_h_deg,
                params.fov_v_deg,
            ));
        }

        let [roll, pitch, yaw] = params.offset_rpy_deg;
        let extrinsic = Isometry3::from_parts(
            Translation3::new(
                params.offset_pos_m[0],
                params.offset_pos_m[1],
                params.offset_pos_m[2],
            ),
            UnitQuaternion::from_euler_angles(
                roll.to_radians(),
                pitch.to_radians(),
                yaw.to_radians(),
            ),
        );

        Ok(Self {
            extrinsic,
            tan_half_fov_h: (params.fov_h_deg.to_radians() / 2.0).tan(),
            tan_half_fov_v: (params.fov_v_deg.to_radians() / 2.0).tan(),
        })
    }

    /// Ground footprint of the camera for the vehicle at the given planar
    /// position, heading and altitude.
    ///
    /// The vehicle world transform (yaw-only rotation, level flight) is
    /// composed with the mounting extrinsic, the four frustum corner rays are
    /// cast and intersected with the plane `z = 0`, and the four ground
    /// points are returned as a CCW quad.
    pub fn footprint(
        &self,
        position: &Point2<f64>,
        yaw_rad: f64,
        altitude_m: f64,
    ) -> Result<Polygon, ProjectionError> {
        let vehicle = Isometry3::new(
            Vector3::new(position.x, position.y, altitude_m),
            Vector3::z() * yaw_rad,
        );
        let cam_world = vehicle * self.extrinsic;

        let origin = cam_world.transform_point(&Point3::origin());
        if origin.z <= MIN_CAM_HEIGHT_M {
            return Err(ProjectionError::CameraBelowGround(origin.z));
        }

        // Corner directions in the camera frame (boresight +X), ordered so
        // the projected quad winds consistently
        let corners = [
            (self.tan_half_fov_h, self.tan_half_fov_v),
            (-self.tan_half_fov_h, self.tan_half_fov_v),
            (-self.tan_half_fov_h, -self.tan_half_fov_v),
            (self.tan_half_fov_h, -self.tan_half_fov_v),
        ];

        let mut ground = Vec::with_capacity(4);
        for &(ty, tz) in &corners {
            let dir = cam_world
                .rotation
                .transform_vector(&Vector3::new(1.0, ty, tz));

            if dir.z >= -MIN_RAY_DESCENT {
                return Err(ProjectionError::RayNotDescending);
            }

            let t = -origin.z / dir.z;
            let hit = origin + dir * t;
            ground.push(Point2::new(hit.x, hit.y));
        }

        // A frustum quad projected from above ground cannot be degenerate, so
        // construction only re-orders winding here
        Polygon::new(ground).map_err(|_| ProjectionError::RayNotDescending)
    }

    /// Convenience wrapper over [`CamModel::footprint`] for a full vehicle
    /// pose.
    pub fn footprint_at(&self, pose: &VehiclePose) -> Result<Polygon, ProjectionError> {
        self.footprint(&pose.position_m, pose.yaw_rad, pose.altitude_m)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn nadir_params(fov_deg: f64) -> CamParams {
        CamParams {
            fov_h_deg: fov_deg,
            fov_v_deg: fov_deg,
            offset_pos_m: [0.0, 0.0, 0.0],
            offset_rpy_deg: [0.0, 90.0, 0.0],
        }
    }

    #[test]
    fn test_nadir_footprint_size() {
        // At 90 degree FOV straight down from altitude h the half-extent on
        // the ground equals h
        let cam = CamModel::new(&nadir_params(90.0)).unwrap();
        let fp = cam.footprint(&Point2::new(0.0, 0.0), 0.0, 2.0).unwrap();

        assert_eq!(fp.num_verts(), 4);
        assert!((fp.area() - 16.0).abs() < 1e-9);

        let c = fp.centroid();
        assert!(c.x.abs() < 1e-9);
        assert!(c.y.abs() < 1e-9);
    }

    #[test]
    fn test_footprint_translates_with_vehicle() {
        let cam = CamModel::new(&nadir_params(60.0)).unwrap();
        let fp = cam.footprint(&Point2::new(3.0, -2.0), 0.0, 5.0).unwrap();
        let c = fp.centroid();
        assert!((c.x - 3.0).abs() < 1e-9);
        assert!((c.y + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_footprint_area_invariant_under_yaw() {
        let cam = CamModel::new(&nadir_params(60.0)).unwrap();
        let fp0 = cam.footprint(&Point2::new(0.0, 0.0), 0.0, 4.0).unwrap();
        let fp1 = cam.footprint(&Point2::new(0.0, 0.0), 1.1, 4.0).unwrap();
        assert!((fp0.area() - fp1.area()).abs() < 1e-9);
    }

    #[test]
    fn test_zero_altitude_rejected() {
        let cam = CamModel::new(&nadir_params(60.0)).unwrap();
        assert!(matches!(
            cam.footprint(&Point2::new(0.0, 0.0), 0.0, 0.0),
            Err(ProjectionError::CameraBelowGround(_))
        ));
    }

    #[test]
    fn test_forward_camera_rejected() {
        // Boresight parallel to the ground: the upper frustum corners never
        // reach the plane
        let params = CamParams {
            offset_rpy_deg: [0.0, 0.0, 0.0],
            ..nadir_params(60.0)
        };
        let cam = CamModel::new(&params).unwrap();
        assert!(matches!(
            cam.footprint(&Point2::new(0.0, 0.0), 0.0, 5.0),
            Err(ProjectionError::RayNotDescending)
        ));
    }

    #[test]
    fn test_invalid_fov_rejected() {
        assert!(matches!(
            CamModel::new(&nadir_params(180.0)),
            Err(ProjectionError::InvalidFov(_, _))
        ));
        assert!(matches!(
            CamModel::new(&nadir_params(0.0)),
            Err(ProjectionError::InvalidFov(_, _))
        ));
    }

    #[test]
    fn test_vehicle_pose_helper() {
        use crate::pose::VehiclePose;
        let pose = VehiclePose::new(1.0, 1.0, 0.0, 3.0);
        let cam = CamModel::new(&nadir_params(90.0)).unwrap();
        let fp = cam.footprint_at(&pose).unwrap();
        let c = fp.centroid();
        assert!((c.x - 1.0).abs() < 1e-9);
    }
}
