//! Multi-polygon regions held as disjoint convex pieces.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::clip::{clip_halfplane, intersect_convex, ring_to_polygon};
use super::triangulate::triangulate;
use super::{GeomError, Polygon};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A region of the plane: zero or more disjoint convex polygons.
///
/// Arbitrary simple polygons are decomposed into convex pieces on insertion,
/// and inserting overlapping polygons only adds the uncovered part, so the
/// stored pieces always remain disjoint. That keeps union, difference and
/// intersection exact while only ever requiring the convex/convex primitives
/// in [`crate::geom::clip`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pieces: Vec<Polygon>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Region {
    /// The empty region.
    pub fn empty() -> Self {
        Self { pieces: Vec::new() }
    }

    /// Build a region from the union of the given simple polygons, which may
    /// overlap each other.
    pub fn from_polygons(polys: &[Polygon]) -> Result<Self, GeomError> {
        let mut region = Self::empty();
        for poly in polys {
            let convex_pieces = if poly.is_convex() {
                vec![poly.clone()]
            } else {
                triangulate(poly)?
            };
            for piece in convex_pieces {
                region.add_piece(piece);
            }
        }
        Ok(region)
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pieces(&self) -> &[Polygon] {
        &self.pieces
    }

    /// Total area of the region.
    pub fn area(&self) -> f64 {
        self.pieces.iter().map(|p| p.area()).sum()
    }

    /// Boundary-inclusive containment test.
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        self.pieces.iter().any(|piece| piece.contains(p))
    }

    /// Area of the intersection between this region and a convex polygon.
    pub fn intersect_area(&self, cutter: &Polygon) -> f64 {
        self.pieces
            .iter()
            .filter_map(|piece| intersect_convex(piece, cutter))
            .map(|p| p.area())
            .sum()
    }

    /// The region remaining after removing a convex polygon.
    pub fn subtract(&self, cutter: &Polygon) -> Region {
        let mut pieces = Vec::with_capacity(self.pieces.len());
        for piece in &self.pieces {
            pieces.extend(difference_convex(piece, cutter));
        }
        Region { pieces }
    }

    /// Area-weighted centroid of the region, `None` when empty.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.pieces.is_empty() {
            return None;
        }
        let mut acc = nalgebra::Vector2::zeros();
        let mut total = 0.0;
        for piece in &self.pieces {
            let a = piece.area();
            acc += piece.centroid().coords * a;
            total += a;
        }
        Some(Point2::from(acc / total))
    }

    /// Insert a convex piece, keeping the stored pieces disjoint by only
    /// adding the part not already covered.
    fn add_piece(&mut self, piece: Polygon) {
        let mut frags = vec![piece];
        for existing in &self.pieces {
            let mut next = Vec::with_capacity(frags.len());
            for frag in &frags {
                next.extend(difference_convex(frag, existing));
            }
            frags = next;
            if frags.is_empty() {
                return;
            }
        }
        self.pieces.extend(frags);
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Difference of two convex polygons as a set of disjoint convex pieces.
///
/// Peels the part of `piece` outside each successive half-plane of `cutter`:
/// every peeled slab is convex, and what remains after all edges is the
/// covered part, which is discarded.
fn difference_convex(piece: &Polygon, cutter: &Polygon) -> Vec<Polygon> {
    if intersect_convex(piece, cutter).is_none() {
        return vec![piece.clone()];
    }

    let mut out = Vec::new();
    let mut remaining = piece.verts().to_vec();

    let n = cutter.num_verts();
    for i in 0..n {
        let a = cutter.verts()[i];
        let b = cutter.verts()[(i + 1) % n];

        let outside = clip_halfplane(&remaining, &a, &b, false);
        if let Some(poly) = ring_to_polygon(outside) {
            out.push(poly);
        }

        remaining = clip_halfplane(&remaining, &a, &b, true);
        if remaining.len() < 3 {
            break;
        }
    }

    out
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn square(x0: f64, y0: f64, side: f64) -> Polygon {
        Polygon::from_coords(&[
            [x0, y0],
            [x0 + side, y0],
            [x0 + side, y0 + side],
            [x0, y0 + side],
        ])
        .unwrap()
    }

    #[test]
    fn test_union_of_overlapping_squares() {
        // Two 2x2 squares overlapping in a 1x1 corner: union area is 7
        let region = Region::from_polygons(&[square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0)])
            .unwrap();
        assert!((region.area() - 7.0).abs() < 1e-9);
        assert!(region.contains(&Point2::new(1.5, 1.5)));
        assert!(!region.contains(&Point2::new(2.5, 0.5)));
    }

    #[test]
    fn test_subtract_centre() {
        let region = Region::from_polygons(&[square(0.0, 0.0, 3.0)]).unwrap();
        let hole = square(1.0, 1.0, 1.0);
        let remaining = region.subtract(&hole);
        assert!((remaining.area() - 8.0).abs() < 1e-9);
        assert!(!remaining.contains(&Point2::new(1.5, 1.5)));
        assert!(remaining.contains(&Point2::new(0.5, 0.5)));
    }

    #[test]
    fn test_subtract_to_empty() {
        let region = Region::from_polygons(&[square(1.0, 1.0, 1.0)]).unwrap();
        let all = square(0.0, 0.0, 3.0);
        let remaining = region.subtract(&all);
        assert!(remaining.is_empty());
        assert!(remaining.area() < 1e-9);
    }

    #[test]
    fn test_subtract_disjoint_is_identity() {
        let region = Region::from_polygons(&[square(0.0, 0.0, 1.0)]).unwrap();
        let far = square(10.0, 10.0, 1.0);
        let remaining = region.subtract(&far);
        assert!((remaining.area() - region.area()).abs() < 1e-12);
    }

    #[test]
    fn test_intersect_area() {
        let region = Region::from_polygons(&[square(0.0, 0.0, 2.0)]).unwrap();
        let cutter = square(1.0, 1.0, 2.0);
        assert!((region.intersect_area(&cutter) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_concave_region_area() {
        let l = Polygon::from_coords(&[
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ])
        .unwrap();
        let region = Region::from_polygons(&[l]).unwrap();
        assert!((region.area() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_weighted() {
        let region = Region::from_polygons(&[square(0.0, 0.0, 1.0)]).unwrap();
        let c = region.centroid().unwrap();
        assert!((c.x - 0.5).abs() < 1e-9);
        assert!((c.y - 0.5).abs() < 1e-9);
        assert!(Region::empty().centroid().is_none());
    }
}
