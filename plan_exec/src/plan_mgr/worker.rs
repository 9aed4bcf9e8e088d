//! Worker thread running coverage searches without blocking the step cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::{Receiver, Sender};

use log::warn;

use crate::geom::{Polygon, Region};
use crate::planner::{CancelToken, CoverageSearch, PlannedPath, PlannerError};
use crate::pose::VehiclePose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything the worker needs to run one search.
///
/// Each request carries its own cancel token, so the manager can abandon an
/// in-flight search by raising the token of the request it dispatched, with
/// no handshake needed before dispatching the next one.
#[derive(Debug)]
pub struct PlanRequest {
    pub start: VehiclePose,

    /// Eroded flight envelope to plan within
    pub envelope: Polygon,

    pub blindspot: Region,

    pub cancel: CancelToken,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub enum WorkerSignal {
    /// The worker should stop its operations
    Stop,

    /// Run a coverage search for the wrapped request
    Plan(Box<PlanRequest>),

    /// The requested search produced a path
    Complete(Box<PlannedPath>),

    /// The requested search failed
    Failed(PlannerError),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub(super) fn worker_thread(
    engine: CoverageSearch,
    main_sender: Sender<WorkerSignal>,
    main_receiver: Receiver<WorkerSignal>,
) {
    // Wait for requests from main
    while let Ok(signal) = main_receiver.recv() {
        match signal {
            WorkerSignal::Stop => break,
            WorkerSignal::Plan(req) => {
                let result = engine.plan(&req.start, &req.envelope, &req.blindspot, &req.cancel);

                let reply = match result {
                    Ok(path) => WorkerSignal::Complete(Box::new(path)),
                    Err(e) => WorkerSignal::Failed(e),
                };

                // Main going away just means we should too
                if main_sender.send(reply).is_err() {
                    break;
                }
            }
            s => warn!("Unexpected signal from main thread: {:?}", s),
        }
    }
}
