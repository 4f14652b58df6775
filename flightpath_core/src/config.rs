//! Scene configuration.
//!
//! Clock, orientation conventions, trail limits and the proximity
//! threshold for a whole scene, loadable from JSON.

use crate::clock::{ClockConfig, SimulationClock};
use crate::engagement::DEFAULT_PROXIMITY_THRESHOLD;
use crate::error::{FlightPathError, Result};
use crate::orientation::{
    AxisConvention, CompositionOrder, FrameSolver, ModelBasis, DEFAULT_COMPOSITION,
    DEFAULT_CONVENTION, DEGENERATE_EPSILON,
};
use crate::trail::{Trail, DEFAULT_MAX_POINTS, DEFAULT_MIN_SEGMENT};

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Orientation conventions shared by every body in a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    pub convention: AxisConvention,
    pub composition: CompositionOrder,
    /// World "up" reference used to level the wings
    pub world_up: Vector3<f64>,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            convention: DEFAULT_CONVENTION,
            composition: DEFAULT_COMPOSITION,
            world_up: Vector3::z(),
        }
    }
}

/// Trail limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    pub max_points: usize,
    pub min_segment_distance: f64,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            min_segment_distance: DEFAULT_MIN_SEGMENT,
        }
    }
}

/// Top-level scene configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub clock: ClockConfig,
    pub orientation: OrientationConfig,
    pub trail: TrailConfig,
    pub proximity_threshold: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            orientation: OrientationConfig::default(),
            trail: TrailConfig::default(),
            proximity_threshold: DEFAULT_PROXIMITY_THRESHOLD,
        }
    }
}

impl SceneConfig {
    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| FlightPathError::io(path, e))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects values the kernel cannot work with.
    pub fn validate(&self) -> Result<()> {
        let c = &self.clock;
        if !(c.tick_unit.is_finite() && c.tick_unit > 0.0) {
            return Err(FlightPathError::invalid_config(format!(
                "clock.tick_unit must be positive, got {}",
                c.tick_unit
            )));
        }
        if !(c.min_speed.is_finite() && c.max_speed.is_finite() && c.min_speed >= 0.0) {
            return Err(FlightPathError::invalid_config(
                "clock speed range must be finite and non-negative",
            ));
        }
        if c.min_speed > c.max_speed {
            return Err(FlightPathError::invalid_config(format!(
                "clock.min_speed ({}) exceeds clock.max_speed ({})",
                c.min_speed, c.max_speed
            )));
        }
        if !c.speed.is_finite() {
            return Err(FlightPathError::invalid_config("clock.speed must be finite"));
        }

        let up = &self.orientation.world_up;
        if !up.iter().all(|v| v.is_finite()) || up.norm_squared() < DEGENERATE_EPSILON {
            return Err(FlightPathError::invalid_config(
                "orientation.world_up must be a non-zero finite vector",
            ));
        }

        if self.trail.max_points == 0 {
            return Err(FlightPathError::invalid_config("trail.max_points must be at least 1"));
        }
        if !(self.trail.min_segment_distance.is_finite() && self.trail.min_segment_distance >= 0.0) {
            return Err(FlightPathError::invalid_config(
                "trail.min_segment_distance must be finite and non-negative",
            ));
        }

        if !(self.proximity_threshold.is_finite() && self.proximity_threshold >= 0.0) {
            return Err(FlightPathError::invalid_config(
                "proximity_threshold must be finite and non-negative",
            ));
        }
        Ok(())
    }

    pub fn make_clock(&self) -> SimulationClock {
        SimulationClock::new(self.clock)
    }

    pub fn make_solver(&self) -> FrameSolver {
        FrameSolver::new(self.orientation.convention)
    }

    pub fn make_trail(&self) -> Trail {
        Trail::new(self.trail.max_points, self.trail.min_segment_distance)
    }

    /// Wraps an asset rotation with the configured composition order.
    pub fn make_basis(&self, rotation: UnitQuaternion<f64>) -> ModelBasis {
        ModelBasis::new(rotation).with_order(self.orientation.composition)
    }
}
