//! Scenario runner - flies demo scenes headless and checks every frame.

use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::{assets, ScenarioId};

use flightpath_core::error::{FlightPathError, Result};
use flightpath_core::orientation::ModelBasis;
use flightpath_core::trajectory::{Axis, Wave};
use flightpath_core::{
    BankingPolicy, ClockState, EasedArc, FlightScene, FrameReport, LinearPath, MovingBody,
    ProximityEvent, ProximityMonitor, SceneConfig, Trajectory, TrajectoryTable, WavePath,
};
use nalgebra::Vector3;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Sampling intervals of the replay table.
pub const REPLAY_INTERVALS: usize = 500;

/// Unit-norm tolerance for orientations.
const NORM_TOLERANCE: f64 = 1e-6;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Whether every frame satisfied the pose and trail checks
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final clock parameter
    pub final_t: f64,

    /// Clock state at the end of the run
    pub final_state: ClockState,

    /// Trail sizes per body, by name
    pub trail_points: Vec<(String, usize)>,

    /// Proximity event, if the scenario has a monitor and it fired
    pub proximity: Option<ProximityEvent>,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

impl ScenarioResult {
    fn failed(scenario: ScenarioId, reason: String) -> Self {
        Self {
            scenario,
            passed: false,
            total_ticks: 0,
            final_t: 0.0,
            final_state: ClockState::Idle,
            trail_points: Vec::new(),
            proximity: None,
            failure_reason: Some(reason),
        }
    }
}

/// Runs demo scenarios.
pub struct ScenarioRunner {
    config: SceneConfig,

    /// Frame budget per run
    max_frames: u64,

    /// Where the replay scenario writes its table; in-memory when unset
    table_path: Option<PathBuf>,

    /// Record every n-th frame into the export
    export_interval: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            max_frames: 1_000,
            table_path: None,
            export_interval: 1,
        }
    }

    /// Sets the frame budget.
    pub fn with_frames(mut self, frames: u64) -> Self {
        self.max_frames = frames;
        self
    }

    /// Overrides the configured clock speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.config.clock.speed = speed;
        self
    }

    /// Writes the replay table to `path` and reloads it from disk.
    pub fn with_table_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.table_path = Some(path.into());
        self
    }

    /// Only records every `interval`-th frame into exports.
    pub fn with_export_interval(mut self, interval: u64) -> Self {
        self.export_interval = interval.max(1);
        self
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None)
    }

    /// Runs a scenario and records its frames for an external viewer.
    pub fn run_recorded(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let mut export = SimExport::new(scenario.name());
        let result = self.execute(scenario, Some(&mut export));
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, mut export: Option<&mut SimExport>) -> ScenarioResult {
        info!("Starting scenario: {}", scenario.name());

        let mut scene = match self.build(scenario) {
            Ok(scene) => scene,
            Err(e) => {
                warn!("Scenario {} could not be built: {}", scenario.name(), e);
                return ScenarioResult::failed(scenario, e.to_string());
            }
        };

        scene.start();
        let mut failure_reason = None;
        let mut ticks = 0;

        while ticks < self.max_frames {
            let report = scene.tick();
            ticks += 1;

            if failure_reason.is_none() {
                failure_reason = self.check_frame(&scene, &report);
            }
            if let Some(export) = export.as_deref_mut() {
                if report.frame % self.export_interval == 0 || report.proximity.is_some() {
                    export.add_frame(SimFrame::capture(&scene, &report));
                }
            }
            if !scene.clock().is_running() {
                debug!("Clock stopped after {} ticks ({:?})", ticks, report.state);
                break;
            }
        }

        let passed = failure_reason.is_none();
        if let Some(export) = export {
            export.finalize(&scene, passed);
        }

        let result = ScenarioResult {
            scenario,
            passed,
            total_ticks: ticks,
            final_t: scene.clock().t(),
            final_state: scene.clock().state(),
            trail_points: scene
                .bodies()
                .map(|(_, body)| (body.name().to_string(), body.trail().map_or(0, |t| t.len())))
                .collect(),
            proximity: scene.proximity_event(),
            failure_reason,
        };

        info!(
            "Scenario {} finished: {} ticks, t={:.3}, passed={}",
            scenario.name(),
            result.total_ticks,
            result.final_t,
            result.passed
        );
        result
    }

    /// Pose and trail invariants for one frame; `Some(reason)` on the first violation.
    fn check_frame(&self, scene: &FlightScene, report: &FrameReport) -> Option<String> {
        if !(0.0..=1.0).contains(&report.t) {
            return Some(format!("frame {}: t={} outside [0,1]", report.frame, report.t));
        }
        for (id, pose) in &report.poses {
            if !pose.is_finite() {
                return Some(format!("frame {}: {} has a non-finite pose", report.frame, id));
            }
            let norm = pose.orientation.quaternion().norm();
            if (norm - 1.0).abs() > NORM_TOLERANCE {
                return Some(format!(
                    "frame {}: {} orientation norm {:.9}",
                    report.frame, id, norm
                ));
            }
        }
        for (id, body) in scene.bodies() {
            if let Some(trail) = body.trail() {
                if trail.len() > trail.max_points() {
                    return Some(format!(
                        "frame {}: {} trail holds {} > {} points",
                        report.frame,
                        id,
                        trail.len(),
                        trail.max_points()
                    ));
                }
            }
        }
        None
    }

    /// Builds the scene flown by `scenario`.
    pub fn build(&self, scenario: ScenarioId) -> Result<FlightScene> {
        self.config.validate()?;
        let mut scene = FlightScene::from_config(&self.config);

        match scenario {
            ScenarioId::Straight => {
                scene.add_body(self.body(
                    "straight",
                    LinearPath::new(Vector3::new(-10.0, 0.0, 0.0), Vector3::new(10.0, 0.0, 0.0)),
                    ModelBasis::identity(),
                    0.0,
                ));
            }
            ScenarioId::Weave => {
                let (aircraft, missile) = weave_paths();
                scene.add_body(self.fighter(aircraft));
                scene.add_body(self.missile(missile));
            }
            ScenarioId::Intercept => {
                let aircraft = EasedArc::new(
                    Vector3::new(-60.0, 0.0, 5.0),
                    Vector3::new(120.0, 0.0, 0.0),
                    Vector3::new(0.0, 20.0, 8.0),
                );
                let missile = EasedArc::new(
                    Vector3::new(80.0, 0.0, 5.0),
                    Vector3::new(-100.0, 0.0, 0.0),
                    Vector3::new(0.0, -15.0, 12.0),
                );
                let a = scene.add_body(
                    self.body(
                        "f14",
                        aircraft,
                        assets::fighter_basis_rolled(),
                        assets::FIGHTER_TAIL_OFFSET,
                    )
                    .with_banking(BankingPolicy::new(1.8, 55.0)),
                );
                let m = scene.add_body(
                    self.missile(missile)
                        .with_banking(BankingPolicy::new(1.2, 35.0)),
                );
                scene.set_proximity_monitor(
                    ProximityMonitor::new(m, a).with_threshold(self.config.proximity_threshold),
                )?;
            }
            ScenarioId::Replay => {
                let table = self.replay_table()?;
                for (track, label) in ["f14", "aim9"].into_iter().enumerate() {
                    let Some(path) = table.track(track) else {
                        continue;
                    };
                    let basis = if track == 0 {
                        assets::fighter_basis()
                    } else {
                        assets::missile_basis()
                    };
                    let offset = if track == 0 {
                        assets::FIGHTER_TAIL_OFFSET
                    } else {
                        assets::MISSILE_TAIL_OFFSET
                    };
                    scene.add_body(self.body(label, path, basis, offset));
                }
            }
        }

        debug!("Built {} with {} bodies", scenario.name(), scene.body_count());
        Ok(scene)
    }

    /// Samples the weave into a table and reads it back, through the
    /// configured file when there is one.
    fn replay_table(&self) -> Result<TrajectoryTable> {
        let (aircraft, missile) = weave_paths();
        let tracks: [&dyn Trajectory; 2] = [&aircraft, &missile];
        let table = TrajectoryTable::sample(&tracks, REPLAY_INTERVALS).with_labels(&["a", "m"]);

        let (loaded, report) = match &self.table_path {
            Some(path) => {
                table.save(path)?;
                TrajectoryTable::load(path, 2)?
            }
            None => {
                let mut buf = Vec::new();
                table
                    .write_to(&mut buf)
                    .and_then(|_| TrajectoryTable::read_from(Cursor::new(buf), 2))
                    .map_err(|e| FlightPathError::io("<memory>", e))?
            }
        };

        if report.skipped > 0 {
            warn!("Replay table: {} rows skipped", report.skipped);
        }
        Ok(loaded)
    }

    fn body(
        &self,
        name: &str,
        trajectory: impl Trajectory + 'static,
        basis: ModelBasis,
        tail_offset: f64,
    ) -> MovingBody {
        MovingBody::new(name, trajectory)
            .with_solver(self.config.make_solver())
            .with_world_up(self.config.orientation.world_up)
            .with_basis(self.config.make_basis(basis.rotation))
            .with_tail_offset(tail_offset)
            .with_trail(self.config.make_trail())
    }

    fn fighter(&self, trajectory: impl Trajectory + 'static) -> MovingBody {
        self.body(
            "f14",
            trajectory,
            assets::fighter_basis(),
            assets::FIGHTER_TAIL_OFFSET,
        )
    }

    fn missile(&self, trajectory: impl Trajectory + 'static) -> MovingBody {
        self.body(
            "aim9",
            trajectory,
            assets::missile_basis(),
            assets::MISSILE_TAIL_OFFSET,
        )
    }
}

/// Fighter and missile paths of the weave scenario.
fn weave_paths() -> (WavePath, WavePath) {
    let aircraft = WavePath::new(Vector3::new(-120.0, 0.0, 0.0), Vector3::new(240.0, 0.0, 0.0))
        .with_wave(Wave::new(Axis::Y, 15.0, 1.5))
        .with_wave(Wave::new(Axis::Z, 15.0, 1.5));
    let missile = WavePath::new(Vector3::new(-110.0, 0.0, 0.0), Vector3::new(260.0, 0.0, -5.0))
        .with_wave(Wave::new(Axis::Y, 25.0, 0.6));
    (aircraft, missile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use flightpath_core::clock::EndPolicy;
    use flightpath_core::AxisConvention;

    fn fast_runner() -> ScenarioRunner {
        ScenarioRunner::new(SceneConfig::default()).with_speed(1.0)
    }

    #[test]
    fn test_all_scenarios_pass() {
        let runner = fast_runner();
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(
                result.passed,
                "{} failed: {:?}",
                scenario,
                result.failure_reason
            );
            assert_eq!(result.trail_points.len(), scenario.body_count());
        }
    }

    #[test]
    fn test_straight_completes_after_100_ticks() {
        let result = fast_runner().run(ScenarioId::Straight);
        // 100 ticks of 0.01, one more if rounding leaves t just below 1
        assert!((100..=101).contains(&result.total_ticks));
        assert_eq!(result.final_state, ClockState::Completed);
        assert_relative_eq!(result.final_t, 1.0);
    }

    #[test]
    fn test_hold_at_end_uses_frame_budget() {
        let mut config = SceneConfig::default();
        config.clock.speed = 1.0;
        config.clock.end_policy = EndPolicy::HoldAtEnd;
        let result = ScenarioRunner::new(config)
            .with_frames(150)
            .run(ScenarioId::Straight);
        assert!(result.passed);
        assert_eq!(result.total_ticks, 150);
        assert_relative_eq!(result.final_t, 1.0);
    }

    #[test]
    fn test_ned_convention_passes() {
        let mut config = SceneConfig::default();
        config.orientation.convention = AxisConvention::Ned;
        let result = ScenarioRunner::new(config)
            .with_speed(1.0)
            .run(ScenarioId::Weave);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let mut config = SceneConfig::default();
        config.trail.max_points = 0;
        let result = ScenarioRunner::new(config).run(ScenarioId::Straight);
        assert!(!result.passed);
        assert_eq!(result.total_ticks, 0);
        assert!(result.failure_reason.is_some());
    }

    #[test]
    fn test_replay_tracks_match_weave() {
        let runner = fast_runner();
        let table = runner.replay_table().unwrap();
        assert_eq!(table.len(), REPLAY_INTERVALS + 1);

        let (aircraft, _) = weave_paths();
        let replayed = table.track(0).unwrap();
        for t in [0.0, 0.25, 0.5, 1.0] {
            assert_relative_eq!(
                replayed.position(t),
                aircraft.position(t),
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn test_replay_through_file() {
        let path = std::env::temp_dir().join(format!(
            "flightpath_replay_{}.txt",
            std::process::id()
        ));
        let result = fast_runner()
            .with_table_path(&path)
            .run(ScenarioId::Replay);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_intercept_has_monitor() {
        let scene = fast_runner().build(ScenarioId::Intercept).unwrap();
        assert!(scene.proximity().is_some());
        assert_eq!(scene.body_count(), 2);
    }

    #[test]
    fn test_recorded_run_exports_frames() {
        let (result, export) = fast_runner()
            .with_export_interval(10)
            .run_recorded(ScenarioId::Straight);
        assert!(export.passed);
        assert_eq!(export.frames.len(), 10);
        assert_eq!(export.trails.len(), 1);
        assert_relative_eq!(export.final_t, result.final_t);
    }
}
