//! FlightPath scenario harness
//!
//! Builds demo scenes on top of `flightpath_core`, flies them without a
//! renderer and checks every frame:
//! - poses stay finite with unit-norm orientations
//! - `t` stays inside `[0, 1]`
//! - trails never exceed their cap
//!
//! Runs can be recorded to JSON for an external viewer.

pub mod exporter;
pub mod runner;
pub mod scenarios;

pub use exporter::{BodyFrame, SimEvent, SimExport, SimFrame, TrailExport};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
