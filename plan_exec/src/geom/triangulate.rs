//! Ear-clipping triangulation of simple polygons.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;

use super::polygon::cross2;
use super::{GeomError, Polygon, GEOM_EPS};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Triangulate a simple CCW polygon into a set of triangles covering the same
/// area.
///
/// O(n^2) ear clipping, which is ample for the vertex counts seen in flight
/// envelopes and blind-spot outlines. Zero-area ears are dropped rather than
/// emitted.
pub fn triangulate(poly: &Polygon) -> Result<Vec<Polygon>, GeomError> {
    let verts = poly.verts();
    let mut idx: Vec<usize> = (0..verts.len()).collect();
    let mut tris = Vec::with_capacity(verts.len().saturating_sub(2));

    while idx.len() > 3 {
        let mut clipped = false;

        for i in 0..idx.len() {
            let prev = verts[idx[(i + idx.len() - 1) % idx.len()]];
            let cur = verts[idx[i]];
            let next = verts[idx[(i + 1) % idx.len()]];

            // Reflex or collinear corners cannot be ears
            let cross = cross2(&(cur - prev), &(next - cur));
            if cross <= GEOM_EPS {
                continue;
            }

            // An ear must not contain any other remaining vertex
            let mut is_ear = true;
            for &j in &idx {
                let p = verts[j];
                if points_eq(&p, &prev) || points_eq(&p, &cur) || points_eq(&p, &next) {
                    continue;
                }
                if point_in_triangle(&p, &prev, &cur, &next) {
                    is_ear = false;
                    break;
                }
            }
            if !is_ear {
                continue;
            }

            if let Ok(tri) = Polygon::new(vec![prev, cur, next]) {
                tris.push(tri);
            }
            idx.remove(i);
            clipped = true;
            break;
        }

        if !clipped {
            // No ear found: strip a collinear vertex if one exists, otherwise
            // the input was not a simple polygon
            match find_collinear(verts, &idx) {
                Some(i) => {
                    idx.remove(i);
                }
                None => return Err(GeomError::TriangulationFailed),
            }
        }
    }

    if idx.len() == 3 {
        if let Ok(tri) = Polygon::new(vec![verts[idx[0]], verts[idx[1]], verts[idx[2]]]) {
            tris.push(tri);
        }
    }

    if tris.is_empty() {
        return Err(GeomError::TriangulationFailed);
    }

    Ok(tris)
}

fn points_eq(a: &Point2<f64>, b: &Point2<f64>) -> bool {
    (a - b).norm() <= GEOM_EPS
}

/// Strict interior test, points on the triangle boundary are not counted.
fn point_in_triangle(
    p: &Point2<f64>,
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
) -> bool {
    let s0 = cross2(&(b - a), &(p - a));
    let s1 = cross2(&(c - b), &(p - b));
    let s2 = cross2(&(a - c), &(p - c));
    s0 > GEOM_EPS && s1 > GEOM_EPS && s2 > GEOM_EPS
}

fn find_collinear(verts: &[Point2<f64>], idx: &[usize]) -> Option<usize> {
    for i in 0..idx.len() {
        let prev = verts[idx[(i + idx.len() - 1) % idx.len()]];
        let cur = verts[idx[i]];
        let next = verts[idx[(i + 1) % idx.len()]];
        if cross2(&(cur - prev), &(next - cur)).abs() <= GEOM_EPS {
            return Some(i);
        }
    }
    None
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_square() {
        let sq =
            Polygon::from_coords(&[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]).unwrap();
        let tris = triangulate(&sq).unwrap();
        assert_eq!(tris.len(), 2);
        let total: f64 = tris.iter().map(|t| t.area()).sum();
        assert!((total - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_concave() {
        // An L shape
        let l = Polygon::from_coords(&[
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ])
        .unwrap();
        let tris = triangulate(&l).unwrap();
        let total: f64 = tris.iter().map(|t| t.area()).sum();
        assert!((total - 3.0).abs() < 1e-9);
        for t in &tris {
            assert!(t.is_convex());
        }
    }

    #[test]
    fn test_triangle_passthrough() {
        let tri = Polygon::from_coords(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
        let tris = triangulate(&tri).unwrap();
        assert_eq!(tris.len(), 1);
        assert!((tris[0].area() - 0.5).abs() < 1e-12);
    }
}
