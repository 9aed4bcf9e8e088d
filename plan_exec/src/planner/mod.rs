//! # Coverage planner
//!
//! Yaw optimisation and best-first coverage search over candidate positions.
//!
//! Three different outcomes terminate a search normally:
//! - the optimality threshold is reached,
//! - the wall-clock timeout expires (the best path found so far is returned),
//! - the blind-spot region is already empty (root-only path).
//!
//! Everything else surfaces as a [`PlannerError`]; no geometry errors leak
//! out of this module.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod search;
pub mod yaw;

pub use search::{CoverageSearch, PlannedPath, SearchNode, SearchParams};
pub use yaw::{YawOptParams, YawOptimizer, YawSolution};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::cam::ProjectionError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cooperative cancellation flag shared between the plan manager and an
/// in-flight search. The search checks it once per expansion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("The search frontier emptied before reaching the optimality threshold")]
    NoPathFound,

    #[error("The search was cancelled by an external signal")]
    Cancelled,

    #[error("The flight envelope has (near) zero area")]
    InvalidEnvelope,

    #[error("Camera projection failed at the search root: {0}")]
    Projection(#[from] ProjectionError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}
