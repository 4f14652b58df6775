//! Demo scenarios and the model assets they fly.

use flightpath_core::ModelBasis;
use nalgebra::Vector3;
use std::f64::consts::PI;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Single body on a straight line along +X
    Straight,

    /// Fighter weaving in Y/Z, missile on a slow lateral arc
    Weave,

    /// Two eased arcs with banking and a proximity check
    Intercept,

    /// Weave sampled into a trajectory table, reloaded and replayed
    Replay,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Straight,
            ScenarioId::Weave,
            ScenarioId::Intercept,
            ScenarioId::Replay,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Straight => "straight",
            ScenarioId::Weave => "weave",
            ScenarioId::Intercept => "intercept",
            ScenarioId::Replay => "replay",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Straight => "Straight line (-10+20t, 0, 0); orientation must stay fixed",
            ScenarioId::Weave => "F-14 weaving ±15 in Y/Z over 1.5 cycles, AIM-9L on a lateral arc",
            ScenarioId::Intercept => "Eased climbing arcs with curvature banking and proximity check",
            ScenarioId::Replay => "Weave written to a 500-interval table, reloaded and interpolated",
        }
    }

    /// Number of bodies the scenario flies.
    pub fn body_count(&self) -> usize {
        match self {
            ScenarioId::Straight => 1,
            _ => 2,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "straight" | "line" => Ok(ScenarioId::Straight),
            "weave" => Ok(ScenarioId::Weave),
            "intercept" | "arc" => Ok(ScenarioId::Intercept),
            "replay" => Ok(ScenarioId::Replay),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Native-axis corrections for the demo models.
pub mod assets {
    use super::*;

    /// F-14 low-poly model: nose, wings and canopy measured against the body frame.
    pub fn fighter_basis() -> ModelBasis {
        ModelBasis::from_xyzw(-0.00622421, 0.713223, -0.700883, -0.0061165)
    }

    /// F-14 basis preceded by a half roll, for the arcs flown canopy-up.
    pub fn fighter_basis_rolled() -> ModelBasis {
        ModelBasis::from_axis_angle(&Vector3::x(), PI).then(&fighter_basis())
    }

    /// AIM-9L model points its nose along −X.
    pub fn missile_basis() -> ModelBasis {
        ModelBasis::from_axis_angle(&Vector3::y(), PI)
    }

    /// Tail sample distance behind the fighter.
    pub const FIGHTER_TAIL_OFFSET: f64 = 4.0;

    /// Tail sample distance behind the missile.
    pub const MISSILE_TAIL_OFFSET: f64 = 5.0;
}
