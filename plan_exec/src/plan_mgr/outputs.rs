//! Outward-facing artefacts built from a held path each publication cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::Serialize;

use crate::geom::Polygon;
use crate::planner::PlannedPath;
use crate::pose::VehiclePose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A waypoint with its arrival-time offset from the start of the path.
#[derive(Debug, Clone, Serialize)]
pub struct TimedPose {
    pub pose: VehiclePose,

    /// Seconds after the start of the path at which the vehicle should
    /// arrive here, including the hold time at earlier waypoints
    pub arrival_time_s: f64,
}

/// Scalar summary of an accepted plan.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanSummary {
    pub optimality: f64,
    pub execution_time_s: f64,
    pub planner_time_s: f64,
    pub num_nodes: usize,
}

/// Everything published for the held path on one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutput {
    /// The next immediate target for the vehicle to fly towards
    pub next_target: VehiclePose,

    /// The full path with arrival-time offsets
    pub timed_poses: Vec<TimedPose>,

    /// The path as a flat pose array
    pub pose_array: Vec<VehiclePose>,

    pub summary: PlanSummary,

    /// Per-node camera footprints, for visualisation
    pub footprints: Vec<Polygon>,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the published artefacts for a held path.
///
/// `altitude_m` is the vehicle's current flight altitude, which the planner
/// holds constant along the path.
pub fn build_output(
    path: &PlannedPath,
    current_pose: &VehiclePose,
    next_pose_dist_m: f64,
    wait_time_s: f64,
) -> PlanOutput {
    let altitude_m = current_pose.altitude_m;

    let pose_array: Vec<VehiclePose> = path
        .nodes
        .iter()
        .map(|n| VehiclePose {
            position_m: n.position_m,
            yaw_rad: n.yaw_rad,
            altitude_m,
        })
        .collect();

    let timed_poses: Vec<TimedPose> = path
        .nodes
        .iter()
        .zip(pose_array.iter())
        .enumerate()
        .map(|(i, (node, pose))| TimedPose {
            pose: *pose,
            arrival_time_s: node.cumulative_time_s + i as f64 * wait_time_s,
        })
        .collect();

    PlanOutput {
        next_target: next_target(&pose_array, current_pose, next_pose_dist_m),
        timed_poses,
        pose_array: pose_array.clone(),
        summary: PlanSummary {
            optimality: path.optimality,
            execution_time_s: path.execution_time_s,
            planner_time_s: path.planner_time_s,
            num_nodes: path.nodes.len(),
        },
        footprints: path.nodes.iter().map(|n| n.footprint.clone()).collect(),
    }
}

/// The point on the path polyline nearest the current pose, advanced along
/// the path by the lookahead distance and clamped at the final node.
///
/// The heading published with the target is the heading of the waypoint the
/// target is moving towards.
fn next_target(
    poses: &[VehiclePose],
    current: &VehiclePose,
    lookahead_m: f64,
) -> VehiclePose {
    // A path always has at least its root node
    if poses.len() == 1 {
        return poses[0];
    }

    // Find the nearest point on the polyline, as a segment index plus a
    // distance along that segment
    let mut best_dist_sq = f64::INFINITY;
    let mut best_seg = 0;
    let mut best_along_m = 0.0;

    for (i, pair) in poses.windows(2).enumerate() {
        let a = pair[0].position_m;
        let b = pair[1].position_m;
        let ab = b - a;
        let len_sq = ab.norm_squared();

        let t = if len_sq > 0.0 {
            ((current.position_m - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let point: Point2<f64> = a + ab * t;
        let dist_sq = (current.position_m - point).norm_squared();

        if dist_sq < best_dist_sq {
            best_dist_sq = dist_sq;
            best_seg = i;
            best_along_m = t * len_sq.sqrt();
        }
    }

    // Walk forward from the start of the nearest segment by the distance to
    // the nearest point plus the lookahead
    let mut remaining_m = best_along_m + lookahead_m;
    for pair in poses.windows(2).skip(best_seg) {
        let a = pair[0].position_m;
        let b = pair[1].position_m;
        let seg_len_m = (b - a).norm();

        if remaining_m <= seg_len_m && seg_len_m > 0.0 {
            let t = remaining_m / seg_len_m;
            return VehiclePose {
                position_m: a + (b - a) * t,
                yaw_rad: pair[1].yaw_rad,
                altitude_m: current.altitude_m,
            };
        }
        remaining_m -= seg_len_m;
    }

    // Lookahead overran the path, clamp to the final node
    poses[poses.len() - 1]
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn pose(x: f64, y: f64) -> VehiclePose {
        VehiclePose::new(x, y, 0.0, 2.0)
    }

    /// A straight three-node path along the X axis with unit spacing.
    fn straight_path() -> Vec<VehiclePose> {
        vec![pose(0.0, 0.0), pose(1.0, 0.0), pose(2.0, 0.0)]
    }

    #[test]
    fn test_target_advances_by_lookahead() {
        let path = straight_path();
        let current = pose(0.2, 0.5);

        // Nearest point is (0.2, 0) so the target is 0.3 further along
        let target = next_target(&path, &current, 0.3);
        assert!((target.position_m.x - 0.5).abs() < 1e-9);
        assert!(target.position_m.y.abs() < 1e-9);
    }

    #[test]
    fn test_target_crosses_segment_boundary() {
        let path = straight_path();
        let current = pose(0.9, 0.0);

        let target = next_target(&path, &current, 0.5);
        assert!((target.position_m.x - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_target_clamped_at_final_node() {
        let path = straight_path();
        let current = pose(1.9, 0.0);

        let target = next_target(&path, &current, 5.0);
        assert!((target.position_m.x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_node_path() {
        let path = vec![pose(3.0, 4.0)];
        let target = next_target(&path, &pose(0.0, 0.0), 1.0);
        assert!((target.position_m.x - 3.0).abs() < 1e-9);
        assert!((target.position_m.y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_target_heading_is_upcoming_waypoint() {
        let mut path = straight_path();
        path[1].yaw_rad = 0.7;
        let target = next_target(&path, &pose(0.1, 0.0), 0.3);
        assert!((target.yaw_rad - 0.7).abs() < 1e-12);
    }
}
