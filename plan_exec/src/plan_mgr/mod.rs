//! # Plan Manager
//!
//! Owns the currently held coverage path, runs searches on a worker thread,
//! and builds the published artefacts each cycle.
//!
//! The manager is single threaded apart from the worker: external inputs are
//! applied and worker results consumed inside [`PlanMgr::step`], so the held
//! path is only ever replaced between publications, never during one.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod outputs;
pub mod params;
mod worker;

pub use outputs::{PlanOutput, PlanSummary, TimedPose};
pub use params::PlanMgrParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::mpsc::{channel, Receiver, Sender, TryRecvError},
    thread::{self, JoinHandle},
};

use log::{debug, error, info, warn};
use serde::Serialize;
use util::params::{load as load_params, LoadError};
use util::session;

use crate::cam::{CamModel, CamParams, ProjectionError};
use crate::geom::{Polygon, Region};
use crate::inputs::InputUpdates;
use crate::planner::{
    CancelToken, CoverageSearch, PlannedPath, PlannerError, SearchParams, YawOptParams,
    YawOptimizer,
};
use crate::pose::VehiclePose;

use self::worker::{worker_thread, PlanRequest, WorkerSignal};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything the manager knows about the world and its current plan.
///
/// All fields start empty and are filled by external updates; nothing is
/// persisted across executions.
#[derive(Debug, Default)]
pub struct PlanState {
    /// The currently held path, replaced only through the acceptance test
    pub path: Option<PlannedPath>,

    /// Flight envelope after inward erosion by the safety buffer
    pub envelope: Option<Polygon>,

    /// Latest blind-spot region
    pub blindspot: Option<Region>,

    /// Latest vehicle pose
    pub pose: Option<VehiclePose>,

    /// Gates publication
    pub enabled: bool,
}

/// The plan manager.
pub struct PlanMgr {
    params: PlanMgrParams,

    state: PlanState,

    worker_jh: Option<JoinHandle<()>>,
    worker_sender: Sender<WorkerSignal>,
    worker_receiver: Receiver<WorkerSignal>,

    /// Cancel token of the request currently in the worker
    active_cancel: Option<CancelToken>,

    /// Newest superseding request, dispatched when the worker frees up
    pending: Option<PlanRequest>,

    search_running: bool,
}

/// Record of one acceptance decision, saved to the session.
#[derive(Debug, Clone, Copy, Serialize)]
struct AcceptanceRecord {
    accepted: bool,
    optimality: f64,
    planner_time_s: f64,
    num_nodes: usize,
    held_optimality: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlanMgrError {
    #[error("Couldn't load parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Invalid camera calibration: {0}")]
    CamError(#[from] ProjectionError),

    #[error("Failed to spawn the worker thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The worker thread has stopped")]
    WorkerDied,

    #[error("Failed to send a request to the worker thread")]
    SendError,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PlanMgr {
    /// Create a new plan manager, loading all parameters and starting the
    /// worker thread.
    pub fn new() -> Result<Self, PlanMgrError> {
        let params: PlanMgrParams = load_params("plan_mgr.toml")?;
        let search_params: SearchParams = load_params("coverage_search.toml")?;
        let yaw_params: YawOptParams = load_params("yaw_opt.toml")?;
        let cam_params: CamParams = load_params("cam.toml")?;

        let cam = CamModel::new(&cam_params)?;
        let engine = CoverageSearch::new(search_params, cam, YawOptimizer::new(yaw_params));

        Self::with_engine(params, engine)
    }

    /// Create a plan manager around an already built search engine.
    pub fn with_engine(
        params: PlanMgrParams,
        engine: CoverageSearch,
    ) -> Result<Self, PlanMgrError> {
        let (worker_sender, rx) = channel();
        let (tx, worker_receiver) = channel();

        let worker_jh = thread::Builder::new()
            .name("plan_mgr::worker".into())
            .spawn(move || worker_thread(engine, tx, rx))
            .map_err(PlanMgrError::SpawnError)?;

        Ok(Self {
            params,
            state: PlanState::default(),
            worker_jh: Some(worker_jh),
            worker_sender,
            worker_receiver,
            active_cancel: None,
            pending: None,
            search_running: false,
        })
    }

    pub fn params(&self) -> &PlanMgrParams {
        &self.params
    }

    pub fn state(&self) -> &PlanState {
        &self.state
    }

    pub fn search_running(&self) -> bool {
        self.search_running
    }

    /// Step the manager: apply external updates, consume worker results, and
    /// build the publication for this cycle.
    ///
    /// Returns `None` when publication is disabled or no path is held yet.
    pub fn step(&mut self, updates: InputUpdates) -> Result<Option<PlanOutput>, PlanMgrError> {
        if let Some(pose) = updates.pose {
            self.state.pose = Some(pose);
        }

        if let Some(enabled) = updates.enabled {
            if enabled != self.state.enabled {
                info!(
                    "Path publication {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }
            self.state.enabled = enabled;
        }

        if let Some(envelope) = updates.envelope {
            self.update_envelope(envelope);
        }

        if let Some(polys) = updates.blindspot {
            self.update_blindspot(polys)?;
        }

        self.recv_worker()?;

        if !self.state.enabled {
            return Ok(None);
        }

        match (&self.state.path, &self.state.pose) {
            (Some(path), Some(pose)) => Ok(Some(outputs::build_output(
                path,
                pose,
                self.params.next_pose_dist_m,
                self.params.wait_time_s,
            ))),
            _ => Ok(None),
        }
    }

    /// Erode and store a fresh flight envelope.
    ///
    /// An envelope that is non convex or empties under erosion suspends
    /// planning (searches are skipped) until a valid one arrives; the held
    /// path is not dropped.
    fn update_envelope(&mut self, envelope: Polygon) {
        match envelope.erode(self.params.buffer_dist_m) {
            Ok(Some(eroded)) => {
                debug!(
                    "Flight envelope updated: area {:.2} m^2 after {} m erosion",
                    eroded.area(),
                    self.params.buffer_dist_m
                );
                self.state.envelope = Some(eroded);
            }
            Ok(None) => {
                error!(
                    "Flight envelope empty after eroding by {} m, planning suspended",
                    self.params.buffer_dist_m
                );
                self.state.envelope = None;
            }
            Err(e) => {
                error!("Invalid flight envelope, planning suspended: {}", e);
                self.state.envelope = None;
            }
        }
    }

    /// Store a fresh blind-spot region and trigger a search for it.
    fn update_blindspot(&mut self, polys: Vec<Polygon>) -> Result<(), PlanMgrError> {
        let region = match Region::from_polygons(&polys) {
            Ok(r) => r,
            Err(e) => {
                error!("Invalid blind-spot region, ignoring update: {}", e);
                return Ok(());
            }
        };
        self.state.blindspot = Some(region.clone());

        let (pose, envelope) = match (&self.state.pose, &self.state.envelope) {
            (Some(p), Some(e)) => (*p, e.clone()),
            _ => {
                warn!("Blind-spot update before pose and envelope are known, not planning");
                return Ok(());
            }
        };

        let request = PlanRequest {
            start: pose,
            envelope,
            blindspot: region,
            cancel: CancelToken::new(),
        };

        if self.search_running {
            // Supersede the in-flight search and coalesce to the newest
            // request
            if let Some(ref active) = self.active_cancel {
                active.cancel();
            }
            if self.pending.replace(request).is_some() {
                debug!("Discarded a superseded pending plan request");
            }
            Ok(())
        } else {
            self.dispatch(request)
        }
    }

    fn dispatch(&mut self, request: PlanRequest) -> Result<(), PlanMgrError> {
        debug!(
            "Dispatching a search: blind-spot area {:.2} m^2",
            request.blindspot.area()
        );
        self.active_cancel = Some(request.cancel.clone());
        self.worker_sender
            .send(WorkerSignal::Plan(Box::new(request)))
            .map_err(|_| PlanMgrError::SendError)?;
        self.search_running = true;
        Ok(())
    }

    fn dispatch_pending(&mut self) -> Result<(), PlanMgrError> {
        match self.pending.take() {
            Some(request) => self.dispatch(request),
            None => Ok(()),
        }
    }

    /// Drain results from the worker.
    fn recv_worker(&mut self) -> Result<(), PlanMgrError> {
        loop {
            match self.worker_receiver.try_recv() {
                Ok(WorkerSignal::Complete(path)) => {
                    self.search_running = false;
                    self.active_cancel = None;
                    self.consider(*path);
                    self.dispatch_pending()?;
                }
                Ok(WorkerSignal::Failed(e)) => {
                    self.search_running = false;
                    self.active_cancel = None;
                    match e {
                        PlannerError::Cancelled => debug!("Superseded search cancelled"),
                        e => warn!("Search failed, keeping the held path: {}", e),
                    }
                    self.dispatch_pending()?;
                }
                Ok(s) => warn!("Unexpected signal from worker: {:?}", s),
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    error!("Worker thread has stopped");
                    return Err(PlanMgrError::WorkerDied);
                }
            }
        }
    }

    /// Apply the acceptance test to a freshly computed path.
    fn consider(&mut self, new: PlannedPath) {
        let accepted = should_accept(
            self.state.path.as_ref(),
            &new,
            self.state.envelope.as_ref(),
            self.params.added_opt_thresh,
        );

        session::save_with_timestamp(
            "plans/acceptance.json",
            AcceptanceRecord {
                accepted,
                optimality: new.optimality,
                planner_time_s: new.planner_time_s,
                num_nodes: new.nodes.len(),
                held_optimality: self.state.path.as_ref().map(|p| p.optimality),
            },
        );

        if accepted {
            info!(
                "Accepted a new path: {} nodes, optimality {:.3}, planned in {:.3} s",
                new.nodes.len(),
                new.optimality,
                new.planner_time_s
            );
            session::save_with_timestamp("plans/path.json", new.clone());
            self.state.path = Some(new);
        } else {
            info!(
                "Rejected a new path: optimality {:.3} does not beat the held {:.3}",
                new.optimality,
                self.state.path.as_ref().map(|p| p.optimality).unwrap_or(0.0)
            );
        }
    }
}

impl Drop for PlanMgr {
    fn drop(&mut self) {
        if let Some(ref active) = self.active_cancel {
            active.cancel();
        }
        let _ = self.worker_sender.send(WorkerSignal::Stop);
        if let Some(jh) = self.worker_jh.take() {
            let _ = jh.join();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// The acceptance test for a freshly computed path.
///
/// - No held path: accept.
/// - Held path with any node outside the current envelope (or no envelope):
///   the held path is invalid, accept.
/// - Otherwise accept only if the new optimality beats the held one by the
///   configured factor. Equal optimality always rejects, so repeated plans
///   over unchanged inputs cannot oscillate.
fn should_accept(
    held: Option<&PlannedPath>,
    new: &PlannedPath,
    envelope: Option<&Polygon>,
    added_opt_thresh: f64,
) -> bool {
    let held = match held {
        Some(h) => h,
        None => return true,
    };

    match envelope {
        Some(env) => {
            if held.nodes.iter().any(|n| !env.contains(&n.position_m)) {
                return true;
            }
        }
        None => return true,
    }

    new.optimality > added_opt_thresh * held.optimality
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::planner::SearchNode;
    use nalgebra::Point2;

    fn node_at(x: f64, y: f64) -> SearchNode {
        SearchNode {
            position_m: Point2::new(x, y),
            yaw_rad: 0.0,
            coverage_m2: 1.0,
            footprint: unit_square(),
            residual: Region::empty(),
            cumulative_time_s: 0.0,
        }
    }

    fn unit_square() -> Polygon {
        Polygon::from_coords(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).unwrap()
    }

    fn path_with(optimality: f64, positions: &[[f64; 2]]) -> PlannedPath {
        PlannedPath {
            nodes: positions.iter().map(|p| node_at(p[0], p[1])).collect(),
            optimality,
            execution_time_s: 1.0,
            planner_time_s: 0.01,
        }
    }

    fn envelope() -> Polygon {
        Polygon::from_coords(&[[-5.0, -5.0], [5.0, -5.0], [5.0, 5.0], [-5.0, 5.0]]).unwrap()
    }

    #[test]
    fn test_accept_when_no_held_path() {
        let new = path_with(0.1, &[[0.0, 0.0]]);
        assert!(should_accept(None, &new, Some(&envelope()), 1.05));
    }

    #[test]
    fn test_reject_equal_optimality() {
        let held = path_with(0.5, &[[0.0, 0.0], [1.0, 0.0]]);
        let new = path_with(0.5, &[[0.0, 0.0], [0.0, 1.0]]);
        assert!(!should_accept(Some(&held), &new, Some(&envelope()), 1.05));
    }

    #[test]
    fn test_reject_marginal_improvement() {
        let held = path_with(0.5, &[[0.0, 0.0]]);
        let new = path_with(0.51, &[[0.0, 0.0]]);
        assert!(!should_accept(Some(&held), &new, Some(&envelope()), 1.05));
    }

    #[test]
    fn test_accept_clear_improvement() {
        let held = path_with(0.5, &[[0.0, 0.0]]);
        let new = path_with(0.6, &[[0.0, 0.0]]);
        assert!(should_accept(Some(&held), &new, Some(&envelope()), 1.05));
    }

    #[test]
    fn test_accept_when_held_path_left_envelope() {
        // A held node outside the envelope invalidates the held path even
        // though the new path is worse
        let held = path_with(0.9, &[[0.0, 0.0], [20.0, 0.0]]);
        let new = path_with(0.2, &[[0.0, 0.0]]);
        assert!(should_accept(Some(&held), &new, Some(&envelope()), 1.05));
    }

    #[test]
    fn test_accept_when_no_envelope() {
        let held = path_with(0.9, &[[0.0, 0.0]]);
        let new = path_with(0.1, &[[0.0, 0.0]]);
        assert!(should_accept(Some(&held), &new, None, 1.05));
    }
}
