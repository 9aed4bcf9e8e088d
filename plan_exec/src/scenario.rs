//! # Scenario files
//!
//! A scenario TOML describes the inputs the executive would normally receive
//! from live transports: the start pose, the flight envelope, and the
//! blind-spot polygons. The executive replays it through the input bus and
//! runs its normal cycle loop, so a scenario exercises exactly the code a
//! live run would.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::Path;

use serde::Deserialize;

use crate::geom::{GeomError, Polygon};
use crate::pose::VehiclePose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A scenario loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Free-text description logged at startup
    pub description: Option<String>,

    pub start_pose: ScenarioPose,

    /// Flight envelope vertices, CCW or CW, must be convex
    pub flight_envelope: Vec<[f64; 2]>,

    /// One vertex list per blind-spot polygon
    pub blind_spots: Vec<Vec<[f64; 2]>>,

    /// Number of cycles to keep running after the first publication, letting
    /// the session capture a steady stream of artefacts
    #[serde(default = "default_settle_cycles")]
    pub settle_cycles: usize,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScenarioPose {
    pub x_m: f64,
    pub y_m: f64,
    pub yaw_rad: f64,
    pub altitude_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Cannot read the scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse the scenario file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid polygon in the scenario: {0}")]
    Geom(#[from] GeomError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Scenario {
    /// Load a scenario from the given TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn start_pose(&self) -> VehiclePose {
        VehiclePose::new(
            self.start_pose.x_m,
            self.start_pose.y_m,
            self.start_pose.yaw_rad,
            self.start_pose.altitude_m,
        )
    }

    pub fn envelope(&self) -> Result<Polygon, ScenarioError> {
        Ok(Polygon::from_coords(&self.flight_envelope)?)
    }

    pub fn blind_spots(&self) -> Result<Vec<Polygon>, ScenarioError> {
        self.blind_spots
            .iter()
            .map(|verts| Polygon::from_coords(verts).map_err(ScenarioError::from))
            .collect()
    }
}

fn default_settle_cycles() -> usize {
    30
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const SCENARIO_TOML: &str = r#"
        description = "Unit test scenario"

        flight_envelope = [[-5.0, -5.0], [5.0, -5.0], [5.0, 5.0], [-5.0, 5.0]]
        blind_spots = [
            [[-2.0, -2.0], [2.0, -2.0], [2.0, 2.0], [-2.0, 2.0]],
        ]

        [start_pose]
        x_m = 0.0
        y_m = 0.0
        yaw_rad = 0.0
        altitude_m = 2.0
    "#;

    #[test]
    fn test_parse() {
        let scenario: Scenario = toml::from_str(SCENARIO_TOML).unwrap();
        assert_eq!(scenario.settle_cycles, 30);

        let envelope = scenario.envelope().unwrap();
        assert!((envelope.area() - 100.0).abs() < 1e-9);

        let spots = scenario.blind_spots().unwrap();
        assert_eq!(spots.len(), 1);
        assert!((spots[0].area() - 16.0).abs() < 1e-9);

        let pose = scenario.start_pose();
        assert!((pose.altitude_m - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_winding_normalised() {
        // Clockwise input is accepted and re-wound
        let cw = Scenario {
            description: None,
            start_pose: ScenarioPose {
                x_m: 0.0,
                y_m: 0.0,
                yaw_rad: 0.0,
                altitude_m: 1.0,
            },
            flight_envelope: vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]],
            blind_spots: vec![],
            settle_cycles: 1,
        };
        let envelope = cw.envelope().unwrap();
        assert!((envelope.area() - 1.0).abs() < 1e-12);
    }
}
