//! # Input bus
//!
//! Bounded channels carrying external updates into the plan manager. One
//! channel per input, drained without blocking once per cycle with
//! newest-wins coalescing, so a slow cycle never builds a backlog of stale
//! poses.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use crate::geom::Polygon;
use crate::pose::VehiclePose;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Depth of each input channel.
const CHANNEL_DEPTH: usize = 8;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Sending half of the bus, handed to whatever feeds the executive (live
/// transports or the scenario runner).
#[derive(Debug, Clone)]
pub struct InputSenders {
    pub pose: SyncSender<VehiclePose>,
    pub envelope: SyncSender<Polygon>,
    pub blindspot: SyncSender<Vec<Polygon>>,
    pub enable: SyncSender<bool>,
}

/// Receiving half of the bus, owned by the executive.
#[derive(Debug)]
pub struct InputBus {
    pose: Receiver<VehiclePose>,
    envelope: Receiver<Polygon>,
    blindspot: Receiver<Vec<Polygon>>,
    enable: Receiver<bool>,
}

/// The newest update on each channel since the last poll, if any.
#[derive(Debug, Default)]
pub struct InputUpdates {
    pub pose: Option<VehiclePose>,
    pub envelope: Option<Polygon>,
    pub blindspot: Option<Vec<Polygon>>,
    pub enabled: Option<bool>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputBus {
    /// Create a connected sender/receiver pair.
    pub fn new() -> (InputSenders, InputBus) {
        let (pose_tx, pose_rx) = sync_channel(CHANNEL_DEPTH);
        let (env_tx, env_rx) = sync_channel(CHANNEL_DEPTH);
        let (blind_tx, blind_rx) = sync_channel(CHANNEL_DEPTH);
        let (enable_tx, enable_rx) = sync_channel(CHANNEL_DEPTH);

        (
            InputSenders {
                pose: pose_tx,
                envelope: env_tx,
                blindspot: blind_tx,
                enable: enable_tx,
            },
            InputBus {
                pose: pose_rx,
                envelope: env_rx,
                blindspot: blind_rx,
                enable: enable_rx,
            },
        )
    }

    /// Drain every channel without blocking, keeping only the newest update
    /// on each.
    pub fn poll(&self) -> InputUpdates {
        InputUpdates {
            pose: self.pose.try_iter().last(),
            envelope: self.envelope.try_iter().last(),
            blindspot: self.blindspot.try_iter().last(),
            enabled: self.enable.try_iter().last(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
