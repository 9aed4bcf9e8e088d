//! Parameters for the plan manager.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters controlling plan acceptance and publication, loaded from
/// `plan_mgr.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanMgrParams {
    /// Safety buffer the flight envelope is eroded inward by before
    /// planning, in meters
    pub buffer_dist_m: f64,

    /// A new path must beat the held path's optimality by this factor to
    /// replace it, must be greater than 1
    pub added_opt_thresh: f64,

    /// Lookahead distance from the nearest point on the path to the next
    /// immediate target, in meters
    pub next_pose_dist_m: f64,

    /// Hold time at each waypoint added to the published arrival-time
    /// offsets, in seconds
    pub wait_time_s: f64,

    /// Frequency of the executive's step cycle, in hertz
    pub cycle_frequency_hz: f64,
}
