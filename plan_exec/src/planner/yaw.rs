//! Single-variable yaw optimisation at a fixed candidate position.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::Deserialize;

use util::maths::wrap_to_2pi;

use crate::cam::{CamModel, ProjectionError};
use crate::geom::Region;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// 1/phi, the golden section bracket reduction ratio.
const INV_PHI: f64 = 0.618_033_988_749_894_9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters controlling the yaw search, loaded from `yaw_opt.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct YawOptParams {
    /// Bracket width at which the golden-section refinement stops, in radians
    pub tolerance_rad: f64,

    /// Hard cap on golden-section iterations
    pub max_iters: usize,

    /// Number of evenly-spaced headings evaluated before refinement
    pub coarse_samples: usize,
}

/// The heading selected for a candidate position and the blind-spot area its
/// footprint covers.
#[derive(Debug, Clone, Copy)]
pub struct YawSolution {
    /// Optimised heading, wrapped to [0, 2pi)
    pub yaw_rad: f64,

    /// Area of the footprint/blind-spot intersection at that heading
    pub coverage_m2: f64,
}

/// Maximises footprint/blind-spot overlap over the vehicle heading.
///
/// The coverage objective is periodic and typically has a single broad peak
/// near the bearing towards the residual region's centroid, so a coarse scan
/// seeded at that bearing followed by golden-section refinement of the best
/// sample finds it reliably without derivatives.
#[derive(Debug, Clone)]
pub struct YawOptimizer {
    params: YawOptParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl YawOptimizer {
    pub fn new(params: YawOptParams) -> Self {
        Self { params }
    }

    /// Best heading for the vehicle at `position` given the remaining
    /// blind-spot region.
    ///
    /// An empty residual has no preferred heading, so the current heading is
    /// returned with zero coverage. Projection failures are position and
    /// yaw independent (a yaw-only rotation never changes how fast the corner
    /// rays descend) and propagate to the caller.
    pub fn optimise(
        &self,
        cam: &CamModel,
        position: &Point2<f64>,
        altitude_m: f64,
        current_yaw_rad: f64,
        residual: &Region,
    ) -> Result<YawSolution, ProjectionError> {
        if residual.is_empty() {
            return Ok(YawSolution {
                yaw_rad: wrap_to_2pi(current_yaw_rad),
                coverage_m2: 0.0,
            });
        }

        let coverage = |yaw: f64| -> Result<f64, ProjectionError> {
            let fp = cam.footprint(position, yaw, altitude_m)?;
            Ok(residual.intersect_area(&fp))
        };

        // Seed the scan at the bearing towards the residual centroid. The
        // centroid exists since the residual is non empty.
        let seed = match residual.centroid() {
            Some(c) => {
                let diff = c - position;
                diff.y.atan2(diff.x)
            }
            None => current_yaw_rad,
        };

        let num_samples = self.params.coarse_samples.max(1);
        let spacing = std::f64::consts::TAU / num_samples as f64;

        let mut best_yaw = seed;
        let mut best_cov = coverage(seed)?;
        for k in 1..num_samples {
            let yaw = seed + k as f64 * spacing;
            let cov = coverage(yaw)?;
            if cov > best_cov {
                best_cov = cov;
                best_yaw = yaw;
            }
        }

        // Refine within one sample spacing either side of the best coarse
        // heading
        let mut lo = best_yaw - spacing;
        let mut hi = best_yaw + spacing;
        let mut x1 = hi - INV_PHI * (hi - lo);
        let mut x2 = lo + INV_PHI * (hi - lo);
        let mut f1 = coverage(x1)?;
        let mut f2 = coverage(x2)?;

        let mut iters = 0;
        while (hi - lo) > self.params.tolerance_rad && iters < self.params.max_iters {
            if f1 < f2 {
                lo = x1;
                x1 = x2;
                f1 = f2;
                x2 = lo + INV_PHI * (hi - lo);
                f2 = coverage(x2)?;
            } else {
                hi = x2;
                x2 = x1;
                f2 = f1;
                x1 = hi - INV_PHI * (hi - lo);
                f1 = coverage(x1)?;
            }
            iters += 1;
        }

        // Never return a heading worse than the best coarse sample
        let (mut yaw, mut cov) = if f1 > f2 { (x1, f1) } else { (x2, f2) };
        if best_cov > cov {
            yaw = best_yaw;
            cov = best_cov;
        }

        Ok(YawSolution {
            yaw_rad: wrap_to_2pi(yaw),
            coverage_m2: cov,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::cam::CamParams;
    use crate::geom::Polygon;

    fn test_params() -> YawOptParams {
        YawOptParams {
            tolerance_rad: 0.01,
            max_iters: 50,
            coarse_samples: 8,
        }
    }

    /// Nadir camera with an elongated footprint so that yaw matters.
    fn elongated_cam() -> CamModel {
        CamModel::new(&CamParams {
            fov_h_deg: 100.0,
            fov_v_deg: 20.0,
            offset_pos_m: [0.0, 0.0, 0.0],
            offset_rpy_deg: [0.0, 90.0, 0.0],
        })
        .unwrap()
    }

    #[test]
    fn test_empty_region_keeps_heading() {
        let cam = elongated_cam();
        let opt = YawOptimizer::new(test_params());
        let sol = opt
            .optimise(&cam, &Point2::new(0.0, 0.0), 5.0, 1.3, &Region::empty())
            .unwrap();
        assert!((sol.yaw_rad - 1.3).abs() < 1e-12);
        assert_eq!(sol.coverage_m2, 0.0);
    }

    #[test]
    fn test_aligns_long_axis_with_strip() {
        // A thin strip along the world X axis under the vehicle. The
        // footprint long axis lies along body Y, so full coverage needs a
        // quarter-turn heading
        let cam = elongated_cam();
        let opt = YawOptimizer::new(test_params());

        let strip = Polygon::from_coords(&[
            [-2.0, -0.25],
            [2.0, -0.25],
            [2.0, 0.25],
            [-2.0, 0.25],
        ])
        .unwrap();
        let region = Region::from_polygons(&[strip]).unwrap();

        let sol = opt
            .optimise(&cam, &Point2::new(0.0, 0.0), 2.0, 0.0, &region)
            .unwrap();

        // At the optimum the whole 4.0 x 0.5 strip fits inside the footprint
        assert!(sol.coverage_m2 > 1.9, "coverage_m2 = {}", sol.coverage_m2);

        // The footprint is symmetric under a half turn, so accept either
        // quarter-turn heading
        use std::f64::consts::{FRAC_PI_2, PI};
        let to_q1 = util::maths::get_ang_dist_2pi(sol.yaw_rad, FRAC_PI_2).abs();
        let to_q3 = util::maths::get_ang_dist_2pi(sol.yaw_rad, PI + FRAC_PI_2).abs();
        assert!(to_q1.min(to_q3) < 0.2, "yaw_rad = {}", sol.yaw_rad);
    }

    #[test]
    fn test_refinement_beats_coarse_scan_floor() {
        // With the region fully inside every footprint the objective is flat,
        // the optimiser must still terminate and report the full area
        let cam = elongated_cam();
        let opt = YawOptimizer::new(test_params());

        let small = Polygon::from_coords(&[
            [-0.1, -0.1],
            [0.1, -0.1],
            [0.1, 0.1],
            [-0.1, 0.1],
        ])
        .unwrap();
        let region = Region::from_polygons(&[small]).unwrap();

        let sol = opt
            .optimise(&cam, &Point2::new(0.0, 0.0), 5.0, 0.0, &region)
            .unwrap();
        assert!((sol.coverage_m2 - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_yaw_wrapped() {
        let cam = elongated_cam();
        let opt = YawOptimizer::new(test_params());
        let strip = Polygon::from_coords(&[
            [-4.8, -0.4],
            [-4.0, -0.4],
            [-4.0, 0.4],
            [-4.8, 0.4],
        ])
        .unwrap();
        let region = Region::from_polygons(&[strip]).unwrap();
        let sol = opt
            .optimise(&cam, &Point2::new(0.0, 0.0), 2.0, 0.0, &region)
            .unwrap();
        assert!(sol.yaw_rad >= 0.0 && sol.yaw_rad < std::f64::consts::TAU);
    }
}
