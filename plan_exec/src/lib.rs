//! # Survey Planner Library
//!
//! Bounded-time informative coverage planning for an aerial vehicle with a
//! downward-looking camera. Given the region the camera has not yet observed
//! and the vehicle's current pose, the planner produces a sequence of
//! waypoints (position + heading) maximising the fraction of that region
//! brought into the camera footprint within a travel-time budget, while
//! remaining inside the allowed flight envelope.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Camera model - projects the camera frustum onto the ground plane
pub mod cam;

/// 2D polygon geometry kernel
pub mod geom;

/// Bounded input channels feeding the plan manager
pub mod inputs;

/// Plan manager - owns the published plan and the search worker
pub mod plan_mgr;

/// Coverage planner - yaw optimisation and best-first coverage search
pub mod planner;

/// Vehicle pose type
pub mod pose;

/// Scenario files for exercising the planner without live transports
pub mod scenario;
