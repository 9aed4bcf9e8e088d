//! Simple polygon type with counter-clockwise winding.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use super::{GeomError, AREA_EPS, GEOM_EPS};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A simple (non-self-intersecting) closed polygon.
///
/// Vertices are stored in counter-clockwise order; construction reverses
/// clockwise input. The ring is implicitly closed, the first vertex is not
/// repeated at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    verts: Vec<Point2<f64>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Polygon {
    /// Build a polygon from a vertex ring, enforcing counter-clockwise
    /// winding.
    pub fn new(mut verts: Vec<Point2<f64>>) -> Result<Self, GeomError> {
        if verts.len() < 3 {
            return Err(GeomError::TooFewVertices(verts.len()));
        }

        let signed = signed_area(&verts);
        if signed.abs() < AREA_EPS {
            return Err(GeomError::ZeroArea);
        }
        if signed < 0.0 {
            verts.reverse();
        }

        Ok(Self { verts })
    }

    /// Build a polygon from `[x, y]` pairs, as found in parameter and
    /// scenario files.
    pub fn from_coords(coords: &[[f64; 2]]) -> Result<Self, GeomError> {
        Self::new(coords.iter().map(|c| Point2::new(c[0], c[1])).collect())
    }

    pub fn verts(&self) -> &[Point2<f64>] {
        &self.verts
    }

    pub fn num_verts(&self) -> usize {
        self.verts.len()
    }

    /// Area of the polygon, always non-negative.
    pub fn area(&self) -> f64 {
        signed_area(&self.verts)
    }

    /// Centroid (centre of mass) of the polygon.
    pub fn centroid(&self) -> Point2<f64> {
        let mut cx = 0.0;
        let mut cy = 0.0;
        let mut acc = 0.0;

        for i in 0..self.verts.len() {
            let a = &self.verts[i];
            let b = &self.verts[(i + 1) % self.verts.len()];
            let cross = a.x * b.y - b.x * a.y;
            acc += cross;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }

        // Degenerate rings are rejected at construction so acc is nonzero
        Point2::new(cx / (3.0 * acc), cy / (3.0 * acc))
    }

    /// Boundary-inclusive containment test: points on an edge or vertex count
    /// as inside.
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        let n = self.verts.len();

        // Boundary check first so that ray casting doesn't have to deal with
        // edge grazing
        for i in 0..n {
            if point_segment_dist(p, &self.verts[i], &self.verts[(i + 1) % n]) <= GEOM_EPS {
                return true;
            }
        }

        // Even-odd ray cast towards +X
        let mut inside = false;
        for i in 0..n {
            let a = &self.verts[i];
            let b = &self.verts[(i + 1) % n];
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }

        inside
    }

    /// Axis-aligned bounds of the polygon as `(min, max)` corners.
    pub fn bounds(&self) -> (Point2<f64>, Point2<f64>) {
        let mut min = self.verts[0];
        let mut max = self.verts[0];
        for v in &self.verts {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        (min, max)
    }

    /// Returns true if the ring is convex (collinear runs allowed).
    pub fn is_convex(&self) -> bool {
        let n = self.verts.len();
        for i in 0..n {
            let a = self.verts[i];
            let b = self.verts[(i + 1) % n];
            let c = self.verts[(i + 2) % n];
            if cross2(&(b - a), &(c - b)) < -GEOM_EPS {
                return false;
            }
        }
        true
    }

    /// Erode a convex polygon inwards by `dist` meters (a negative buffer).
    ///
    /// Each edge is offset along its interior normal and the offset support
    /// lines re-intersected. Returns `None` if the polygon is consumed by the
    /// erosion, `Err(NotConvex)` if the ring is not convex.
    pub fn erode(&self, dist: f64) -> Result<Option<Polygon>, GeomError> {
        if !self.is_convex() {
            return Err(GeomError::NotConvex);
        }
        if dist.abs() < GEOM_EPS {
            return Ok(Some(self.clone()));
        }

        let n = self.verts.len();

        // Offset support line per edge: a point on the line plus direction
        let mut lines = Vec::with_capacity(n);
        for i in 0..n {
            let a = self.verts[i];
            let b = self.verts[(i + 1) % n];
            let dir = b - a;
            let len = dir.norm();
            if len < GEOM_EPS {
                continue;
            }
            // Interior of a CCW ring lies to the left of each directed edge
            let normal = Vector2::new(-dir.y, dir.x) / len;
            lines.push((a + normal * dist, dir / len));
        }

        if lines.len() < 3 {
            return Ok(None);
        }

        // New vertices are intersections of neighbouring offset lines
        let mut verts = Vec::with_capacity(lines.len());
        for i in 0..lines.len() {
            let (p0, d0) = lines[(i + lines.len() - 1) % lines.len()];
            let (p1, d1) = lines[i];
            match line_intersection(&p0, &d0, &p1, &d1) {
                Some(v) => verts.push(v),
                // Parallel neighbouring edges: the ring is degenerate
                None => return Ok(None),
            }
        }

        // The erosion may have turned the ring inside out
        if signed_area(&verts) < AREA_EPS {
            return Ok(None);
        }

        match Polygon::new(verts) {
            Ok(p) if p.is_convex() => Ok(Some(p)),
            _ => Ok(None),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Shoelace signed area of a vertex ring: positive for counter-clockwise.
pub(crate) fn signed_area(verts: &[Point2<f64>]) -> f64 {
    let mut acc = 0.0;
    for i in 0..verts.len() {
        let a = &verts[i];
        let b = &verts[(i + 1) % verts.len()];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc
}

/// 2D cross product (z component of the 3D cross).
pub(crate) fn cross2(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Distance from a point to a line segment.
pub(crate) fn point_segment_dist(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < GEOM_EPS * GEOM_EPS {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).max(0.0).min(1.0);
    (p - (a + ab * t)).norm()
}

/// Intersection of two infinite lines given as point + direction.
fn line_intersection(
    p0: &Point2<f64>,
    d0: &Vector2<f64>,
    p1: &Point2<f64>,
    d1: &Vector2<f64>,
) -> Option<Point2<f64>> {
    let denom = cross2(d0, d1);
    if denom.abs() < GEOM_EPS {
        return None;
    }
    let t = cross2(&(p1 - p0), d1) / denom;
    Some(p0 + d0 * t)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::from_coords(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).unwrap()
    }

    #[test]
    fn test_area_and_winding() {
        let sq = unit_square();
        assert!((sq.area() - 1.0).abs() < 1e-12);

        // Clockwise input is reversed to CCW
        let cw = Polygon::from_coords(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]).unwrap();
        assert!((cw.area() - 1.0).abs() < 1e-12);
        assert!(signed_area(cw.verts()) > 0.0);
    }

    #[test]
    fn test_degenerate_rejected() {
        assert!(matches!(
            Polygon::from_coords(&[[0.0, 0.0], [1.0, 0.0]]),
            Err(GeomError::TooFewVertices(2))
        ));
        assert!(matches!(
            Polygon::from_coords(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]),
            Err(GeomError::ZeroArea)
        ));
    }

    #[test]
    fn test_contains_is_boundary_inclusive() {
        let sq = unit_square();
        assert!(sq.contains(&Point2::new(0.5, 0.5)));
        // On an edge
        assert!(sq.contains(&Point2::new(1.0, 0.5)));
        // On a vertex
        assert!(sq.contains(&Point2::new(0.0, 0.0)));
        assert!(!sq.contains(&Point2::new(1.5, 0.5)));
        assert!(!sq.contains(&Point2::new(0.5, -0.1)));
    }

    #[test]
    fn test_bounds() {
        let tri = Polygon::from_coords(&[[1.0, 2.0], [4.0, 2.0], [2.0, 5.0]]).unwrap();
        let (min, max) = tri.bounds();
        assert_eq!((min.x, min.y), (1.0, 2.0));
        assert_eq!((max.x, max.y), (4.0, 5.0));
    }

    #[test]
    fn test_centroid() {
        let sq = unit_square();
        let c = sq.centroid();
        assert!((c.x - 0.5).abs() < 1e-12);
        assert!((c.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_erode_square() {
        let sq = unit_square();
        let eroded = sq.erode(0.25).unwrap().unwrap();
        assert!((eroded.area() - 0.25).abs() < 1e-9);
        assert!(eroded.contains(&Point2::new(0.5, 0.5)));
        assert!(!eroded.contains(&Point2::new(0.1, 0.1)));

        // Erosion beyond the inradius consumes the polygon
        assert!(sq.erode(0.6).unwrap().is_none());
    }

    #[test]
    fn test_erode_rejects_concave() {
        let concave = Polygon::from_coords(&[
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 2.0],
            [1.0, 0.5],
            [0.0, 2.0],
        ])
        .unwrap();
        assert!(matches!(concave.erode(0.1), Err(GeomError::NotConvex)));
    }
}
