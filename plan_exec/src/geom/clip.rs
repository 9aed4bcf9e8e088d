//! Convex polygon clipping (Sutherland-Hodgman).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;

use super::polygon::{cross2, signed_area};
use super::{Polygon, AREA_EPS, GEOM_EPS};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Intersection of two convex polygons.
///
/// Returns `None` if the intersection is empty or degenerate (zero area).
/// Both inputs must be convex CCW rings; the subject is clipped against every
/// half-plane of the clip polygon.
pub fn intersect_convex(subject: &Polygon, clip: &Polygon) -> Option<Polygon> {
    let mut ring: Vec<Point2<f64>> = subject.verts().to_vec();

    let n = clip.num_verts();
    for i in 0..n {
        let a = clip.verts()[i];
        let b = clip.verts()[(i + 1) % n];
        ring = clip_halfplane(&ring, &a, &b, true);
        if ring.len() < 3 {
            return None;
        }
    }

    ring_to_polygon(ring)
}

/// Clip a ring against the infinite line through `a` and `b`.
///
/// With `keep_left` true the part to the left of the directed line (the
/// interior side for CCW rings) is kept, otherwise the part to the right.
/// Points on the line are always kept.
pub(crate) fn clip_halfplane(
    ring: &[Point2<f64>],
    a: &Point2<f64>,
    b: &Point2<f64>,
    keep_left: bool,
) -> Vec<Point2<f64>> {
    let dir = b - a;
    let side = |p: &Point2<f64>| {
        let s = cross2(&dir, &(p - a));
        if keep_left {
            s
        } else {
            -s
        }
    };

    let mut out = Vec::with_capacity(ring.len() + 1);

    for i in 0..ring.len() {
        let cur = ring[i];
        let next = ring[(i + 1) % ring.len()];
        let s_cur = side(&cur);
        let s_next = side(&next);

        if s_cur >= -GEOM_EPS {
            out.push(cur);
            if s_next < -GEOM_EPS && s_cur > GEOM_EPS {
                out.push(line_crossing(&cur, &next, s_cur, s_next));
            }
        } else if s_next > GEOM_EPS {
            out.push(line_crossing(&cur, &next, s_cur, s_next));
        }
    }

    out
}

/// Validate a clipped ring into a polygon, dropping degenerate output.
pub(crate) fn ring_to_polygon(ring: Vec<Point2<f64>>) -> Option<Polygon> {
    if ring.len() < 3 || signed_area(&ring).abs() < AREA_EPS {
        return None;
    }

    // Clipping can emit duplicate vertices where an edge meets the clip line
    let mut dedup: Vec<Point2<f64>> = Vec::with_capacity(ring.len());
    for p in ring {
        if dedup
            .last()
            .map(|l: &Point2<f64>| (p - l).norm() > GEOM_EPS)
            .unwrap_or(true)
        {
            dedup.push(p);
        }
    }
    if let (Some(first), Some(last)) = (dedup.first(), dedup.last()) {
        if dedup.len() > 1 && (first - last).norm() <= GEOM_EPS {
            dedup.pop();
        }
    }

    Polygon::new(dedup).ok()
}

/// Point where the segment cur->next crosses the clip line, interpolated from
/// the signed side values.
fn line_crossing(
    cur: &Point2<f64>,
    next: &Point2<f64>,
    s_cur: f64,
    s_next: f64,
) -> Point2<f64> {
    let t = s_cur / (s_cur - s_next);
    cur + (next - cur) * t
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
