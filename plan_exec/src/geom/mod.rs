//! # Geometry kernel
//!
//! Deterministic 2D polygon arithmetic for the coverage planner. Polygons are
//! simple closed rings with counter-clockwise winding; regions are
//! multi-polygons held as disjoint convex pieces so that every boolean
//! operation reduces to the convex/convex case.
//!
//! All operations are pure functions over immutable values.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod clip;
mod polygon;
mod region;
mod triangulate;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use clip::intersect_convex;
pub use polygon::Polygon;
pub use region::Region;
pub use triangulate::triangulate;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Tolerance on cross products and point-line distances, in meters.
pub(crate) const GEOM_EPS: f64 = 1e-9;

/// Polygons with less area than this are treated as empty, in square meters.
pub(crate) const AREA_EPS: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GeomError {
    #[error("A polygon requires at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("The polygon has (near) zero area")]
    ZeroArea,

    #[error("Expected a convex polygon")]
    NotConvex,

    #[error("Could not triangulate the polygon, is it self-intersecting?")]
    TriangulationFailed,
}
