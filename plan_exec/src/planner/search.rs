//! Best-first coverage search over candidate camera positions.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use log::{debug, trace, warn};
use nalgebra::{Point2, Vector2};
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::cam::CamModel;
use crate::geom::{Polygon, Region, AREA_EPS};
use crate::planner::yaw::YawOptimizer;
use crate::planner::{CancelToken, PlannerError};
use crate::pose::VehiclePose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters controlling the coverage search, loaded from
/// `coverage_search.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    /// Fraction of the blind-spot area that must be covered for a path to be
    /// accepted, in [0, 1]
    pub optimality_threshold: f64,

    /// Maximum modelled flight time of a returned path, in seconds
    pub max_execution_time_s: f64,

    /// Assumed constant flight speed between waypoints, in meters per second
    pub max_speed_ms: f64,

    /// Wall-clock budget for a single search, in seconds
    pub timeout_s: f64,

    /// Distance from a node to each of its candidate neighbours, in meters
    pub neighbour_dist_m: f64,

    /// Number of evenly-spaced candidate neighbours per expansion
    pub num_neighbours: usize,
}

/// A single camera position on a planned path.
#[derive(Debug, Clone, Serialize)]
pub struct SearchNode {
    /// Position of the vehicle in the world XY plane
    pub position_m: Point2<f64>,

    /// Optimised heading at this position, in [0, 2pi) radians
    pub yaw_rad: f64,

    /// Blind-spot area newly covered by this node's footprint
    pub coverage_m2: f64,

    /// Ground footprint of the camera at this node
    pub footprint: Polygon,

    /// Blind-spot area still uncovered after this node and all its ancestors
    pub residual: Region,

    /// Modelled flight time from the start pose to this node, in seconds
    pub cumulative_time_s: f64,
}

/// The result of a successful coverage search.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedPath {
    /// Path nodes in flight order, the first being the start pose
    pub nodes: Vec<SearchNode>,

    /// Fraction of the original blind-spot area the path covers, in [0, 1]
    pub optimality: f64,

    /// Modelled flight time of the whole path, in seconds
    pub execution_time_s: f64,

    /// Wall-clock time the search took, in seconds
    pub planner_time_s: f64,
}

/// The coverage search engine.
///
/// Nodes live in an arena indexed by insertion order, with a parallel parent
/// index vector for path reconstruction. The frontier is a max-heap keyed on
/// the ordering in [`FrontierEntry`].
#[derive(Debug, Clone)]
pub struct CoverageSearch {
    params: SearchParams,
    cam: CamModel,
    yaw_opt: YawOptimizer,
}

/// Frontier key: highest newly-covered area first, then lowest cumulative
/// flight time, then lowest node id. The id tie-break makes the expansion
/// order, and with it the returned path, fully deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrontierEntry {
    coverage_m2: NotNan<f64>,
    cumulative_time_s: NotNan<f64>,
    id: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coverage_m2
            .cmp(&other.coverage_m2)
            .then_with(|| other.cumulative_time_s.cmp(&self.cumulative_time_s))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl CoverageSearch {
    pub fn new(params: SearchParams, cam: CamModel, yaw_opt: YawOptimizer) -> Self {
        Self {
            params,
            cam,
            yaw_opt,
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Search for a path through the flight envelope covering the blind-spot
    /// region.
    ///
    /// Terminates with a path when the best frontier node reaches the
    /// optimality threshold, or with the best path found so far when the
    /// wall-clock timeout expires. An exhausted frontier is
    /// [`PlannerError::NoPathFound`]; a raised cancel token is
    /// [`PlannerError::Cancelled`].
    pub fn plan(
        &self,
        start: &VehiclePose,
        envelope: &Polygon,
        blindspot: &Region,
        cancel: &CancelToken,
    ) -> Result<PlannedPath, PlannerError> {
        let timer = Instant::now();

        if envelope.area() < AREA_EPS {
            return Err(PlannerError::InvalidEnvelope);
        }

        let total_area_m2 = blindspot.area();

        // Root node at the start pose. A projection failure here is fatal
        // since it cannot improve at any other candidate.
        let root_sol = self.yaw_opt.optimise(
            &self.cam,
            &start.position_m,
            start.altitude_m,
            start.yaw_rad,
            blindspot,
        )?;
        let root_fp = self
            .cam
            .footprint(&start.position_m, root_sol.yaw_rad, start.altitude_m)?;
        let root_residual = blindspot.subtract(&root_fp);

        let mut nodes = vec![SearchNode {
            position_m: start.position_m,
            yaw_rad: root_sol.yaw_rad,
            coverage_m2: root_sol.coverage_m2,
            footprint: root_fp,
            residual: root_residual,
            cumulative_time_s: 0.0,
        }];
        let mut parents: Vec<Option<usize>> = vec![None];

        // Nothing left to observe: the start pose alone is a complete plan
        if total_area_m2 <= AREA_EPS {
            debug!("Blind-spot region is empty, returning root-only path");
            return Ok(PlannedPath {
                nodes,
                optimality: 1.0,
                execution_time_s: 0.0,
                planner_time_s: timer.elapsed().as_secs_f64(),
            });
        }

        let mut frontier = BinaryHeap::new();
        if let Some(entry) = frontier_entry(&nodes[0], 0) {
            frontier.push(entry);
        }

        while let Some(entry) = frontier.pop() {
            if cancel.is_cancelled() {
                return Err(PlannerError::Cancelled);
            }

            let optimality = covered_fraction(total_area_m2, nodes[entry.id].residual.area());
            let timed_out = timer.elapsed().as_secs_f64() >= self.params.timeout_s;

            if optimality >= self.params.optimality_threshold || timed_out {
                if timed_out && optimality < self.params.optimality_threshold {
                    debug!(
                        "Search timed out after {} nodes, returning best path \
                        (optimality {:.3})",
                        nodes.len(),
                        optimality
                    );
                }
                return Ok(reconstruct(
                    entry.id, &nodes, &parents, optimality, &timer,
                ));
            }

            self.expand(
                entry.id,
                start.altitude_m,
                envelope,
                &mut nodes,
                &mut parents,
                &mut frontier,
            );
        }

        Err(PlannerError::NoPathFound)
    }

    /// Generate the candidate neighbours of a node, pushing the viable ones
    /// onto the frontier.
    fn expand(
        &self,
        id: usize,
        altitude_m: f64,
        envelope: &Polygon,
        nodes: &mut Vec<SearchNode>,
        parents: &mut Vec<Option<usize>>,
        frontier: &mut BinaryHeap<FrontierEntry>,
    ) {
        let parent_pos = nodes[id].position_m;
        let parent_time = nodes[id].cumulative_time_s;
        let parent_residual = nodes[id].residual.clone();

        let num = self.params.num_neighbours;
        let hop_time = self.params.neighbour_dist_m / self.params.max_speed_ms;

        for k in 0..num {
            let angle = k as f64 * std::f64::consts::TAU / num as f64;
            let pos = parent_pos
                + Vector2::new(angle.cos(), angle.sin()) * self.params.neighbour_dist_m;

            if !envelope.contains(&pos) {
                continue;
            }

            let arrival_s = parent_time + hop_time;
            if arrival_s > self.params.max_execution_time_s {
                continue;
            }

            // Heading of travel seeds the optimiser's empty-region fallback
            let sol = match self.yaw_opt.optimise(
                &self.cam,
                &pos,
                altitude_m,
                angle,
                &parent_residual,
            ) {
                Ok(sol) => sol,
                Err(e) => {
                    warn!("Rejecting neighbour at {:?}: {}", pos, e);
                    continue;
                }
            };

            let footprint = match self.cam.footprint(&pos, sol.yaw_rad, altitude_m) {
                Ok(fp) => fp,
                Err(e) => {
                    warn!("Rejecting neighbour at {:?}: {}", pos, e);
                    continue;
                }
            };

            let residual = parent_residual.subtract(&footprint);
            let node = SearchNode {
                position_m: pos,
                yaw_rad: sol.yaw_rad,
                coverage_m2: sol.coverage_m2,
                footprint,
                residual,
                cumulative_time_s: arrival_s,
            };

            let node_id = nodes.len();
            match frontier_entry(&node, node_id) {
                Some(entry) => {
                    trace!(
                        "Node {}: pos ({:.2}, {:.2}), coverage {:.3} m^2",
                        node_id,
                        pos.x,
                        pos.y,
                        sol.coverage_m2
                    );
                    nodes.push(node);
                    parents.push(Some(id));
                    frontier.push(entry);
                }
                None => warn!("Rejecting neighbour at {:?}: non-finite key", pos),
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Fraction of the blind-spot covered given its original and residual areas.
fn covered_fraction(total_m2: f64, residual_m2: f64) -> f64 {
    if total_m2 <= AREA_EPS {
        return 1.0;
    }
    ((total_m2 - residual_m2) / total_m2).clamp(0.0, 1.0)
}

fn frontier_entry(node: &SearchNode, id: usize) -> Option<FrontierEntry> {
    Some(FrontierEntry {
        coverage_m2: NotNan::new(node.coverage_m2).ok()?,
        cumulative_time_s: NotNan::new(node.cumulative_time_s).ok()?,
        id,
    })
}

/// Walk the parent indices from the terminal node back to the root and emit
/// the path in flight order.
fn reconstruct(
    terminal: usize,
    nodes: &[SearchNode],
    parents: &[Option<usize>],
    optimality: f64,
    timer: &Instant,
) -> PlannedPath {
    let mut order = vec![terminal];
    let mut current = terminal;
    while let Some(parent) = parents[current] {
        if order.len() > parents.len() {
            warn!("Parent chain longer than the arena, truncating path");
            break;
        }
        order.push(parent);
        current = parent;
    }
    order.reverse();

    let path_nodes: Vec<SearchNode> = order.iter().map(|&i| nodes[i].clone()).collect();
    let execution_time_s = path_nodes
        .last()
        .map(|n| n.cumulative_time_s)
        .unwrap_or(0.0);

    PlannedPath {
        nodes: path_nodes,
        optimality,
        execution_time_s,
        planner_time_s: timer.elapsed().as_secs_f64(),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
