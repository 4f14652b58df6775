//! JSON exporter for external viewers.
//!
//! Exports per-frame poses and final trails so a separate renderer can
//! replay a headless run.

use flightpath_core::{FlightScene, FrameReport, ProximityEvent};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Frame counter
    pub frame: u64,

    /// Clock parameter
    pub t: f64,

    /// Body poses
    pub bodies: Vec<BodyFrame>,

    /// Events (proximity hits)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

impl SimFrame {
    /// Captures a frame from the report just produced by `scene`.
    pub fn capture(scene: &FlightScene, report: &FrameReport) -> Self {
        let bodies = report
            .poses
            .iter()
            .map(|(id, pose)| {
                let (name, trail_len) = scene
                    .body(*id)
                    .map(|b| (b.name().to_string(), b.trail().map_or(0, |t| t.len())))
                    .unwrap_or_default();
                let q = pose.orientation.quaternion();
                BodyFrame {
                    id: id.0,
                    name,
                    position: to_array(&pose.position),
                    orientation: [q.i, q.j, q.k, q.w],
                    trail_len,
                }
            })
            .collect();

        let events = report
            .proximity
            .iter()
            .map(SimEvent::from_proximity)
            .collect();

        Self {
            frame: report.frame,
            t: report.t,
            bodies,
            events,
        }
    }
}

/// Pose of one body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyFrame {
    pub id: usize,
    pub name: String,
    pub position: [f64; 3],
    /// Quaternion as `[x, y, z, w]`
    pub orientation: [f64; 4],
    pub trail_len: usize,
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    fn from_proximity(event: &ProximityEvent) -> Self {
        Self {
            message: format!(
                "proximity at t={:.3}, separation {:.3}",
                event.t, event.distance
            ),
            level: Some("warn".to_string()),
        }
    }
}

/// Final trail polyline of one body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailExport {
    pub body: String,
    pub points: Vec<[f64; 3]>,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Final clock parameter
    pub final_t: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Trails at the end of the run
    pub trails: Vec<TrailExport>,

    /// Final results
    pub passed: bool,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            final_t: 0.0,
            frames: Vec::new(),
            trails: Vec::new(),
            passed: false,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.final_t = frame.t;
        self.frames.push(frame);
    }

    /// Finalizes the export, snapshotting every trail in `scene`.
    pub fn finalize(&mut self, scene: &FlightScene, passed: bool) {
        self.passed = passed;
        self.final_t = scene.clock().t();
        self.trails = scene
            .bodies()
            .map(|(id, body)| TrailExport {
                body: body.name().to_string(),
                points: scene
                    .current_trail_points(id)
                    .unwrap_or_default()
                    .iter()
                    .map(to_array)
                    .collect(),
            })
            .collect();
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

fn to_array(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightpath_core::{LinearPath, MovingBody, Trail};

    #[test]
    fn test_capture_and_finalize() {
        let mut scene = FlightScene::default();
        scene.add_body(
            MovingBody::new(
                "line",
                LinearPath::new(Vector3::zeros(), Vector3::new(100.0, 0.0, 0.0)),
            )
            .with_trail(Trail::new(10, 0.0)),
        );
        scene.start();

        let mut export = SimExport::new("straight");
        for _ in 0..3 {
            let report = scene.tick();
            export.add_frame(SimFrame::capture(&scene, &report));
        }
        export.finalize(&scene, true);

        assert_eq!(export.frames.len(), 3);
        assert_eq!(export.frames[2].bodies[0].name, "line");
        assert_eq!(export.frames[2].bodies[0].trail_len, 3);
        assert_eq!(export.trails[0].points.len(), 3);
        assert!(export.passed);

        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"scenario\":\"straight\""));
        assert!(!json.contains("events"));
    }
}
