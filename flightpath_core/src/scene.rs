//! FlightScene - one clock, many bodies, one synchronous update per frame.
//!
//! The scene is the whole per-frame pipeline:
//!
//! ```text
//! control input ──► clock ──► body.update(&clock) ──► pose + trail ──► renderer
//!   (start/stop/                 (every body,          (current_pose,
//!    reset/scrub)                 same frame)           current_trail_points)
//! ```
//!
//! Everything runs on the caller's thread. Control calls mutate state that
//! the very next `update` observes; there is no locking and no queue.

use crate::body::{BodyId, MovingBody, Pose};
use crate::clock::{ClockState, SimulationClock};
use crate::config::SceneConfig;
use crate::engagement::{ProximityEvent, ProximityMonitor};
use crate::error::{FlightPathError, Result};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything produced by one call to [`FlightScene::update`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    /// Frame counter (starts at 1 for the first update)
    pub frame: u64,
    /// Clock parameter the poses were resolved at
    pub t: f64,
    pub state: ClockState,
    pub poses: Vec<(BodyId, Pose)>,
    /// Proximity event that fired on this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proximity: Option<ProximityEvent>,
}

/// A set of bodies sharing one simulation clock.
pub struct FlightScene {
    clock: SimulationClock,
    bodies: Vec<MovingBody>,
    proximity: Option<ProximityMonitor>,
    frame: u64,
}

impl Default for FlightScene {
    fn default() -> Self {
        Self::new(SimulationClock::default())
    }
}

impl FlightScene {
    pub fn new(clock: SimulationClock) -> Self {
        Self {
            clock,
            bodies: Vec::new(),
            proximity: None,
            frame: 0,
        }
    }

    /// Builds an empty scene with the configured clock.
    pub fn from_config(config: &SceneConfig) -> Self {
        Self::new(config.make_clock())
    }

    /// Adds a body, resolving its pose at the current `t`.
    pub fn add_body(&mut self, mut body: MovingBody) -> BodyId {
        let id = BodyId(self.bodies.len());
        body.resolve(self.clock.t());
        debug!("Added {} as {}", body.name(), id);
        self.bodies.push(body);
        id
    }

    /// Watches the separation of two bodies; the clock stops when they meet.
    pub fn set_proximity_monitor(&mut self, monitor: ProximityMonitor) -> Result<()> {
        for id in [monitor.pursuer, monitor.target] {
            if id.0 >= self.bodies.len() {
                return Err(FlightPathError::UnknownBody(id));
            }
        }
        self.proximity = Some(monitor);
        Ok(())
    }

    pub fn proximity(&self) -> Option<&ProximityMonitor> {
        self.proximity.as_ref()
    }

    /// Latched proximity event, if any.
    pub fn proximity_event(&self) -> Option<ProximityEvent> {
        self.proximity.as_ref().and_then(ProximityMonitor::event)
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn body(&self, id: BodyId) -> Result<&MovingBody> {
        self.bodies.get(id.0).ok_or(FlightPathError::UnknownBody(id))
    }

    /// Bodies with their handles, in insertion order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &MovingBody)> + '_ {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    /// Advances one fixed clock tick and updates every body.
    pub fn tick(&mut self) -> FrameReport {
        let dt_unit = self.clock.tick_unit();
        self.update(dt_unit)
    }

    /// Advances the clock by `speed * dt_unit`, then resolves every body,
    /// appends trail samples and checks proximity.
    ///
    /// While a proximity event is latched the clock does not advance.
    pub fn update(&mut self, dt_unit: f64) -> FrameReport {
        if !self.proximity.as_ref().is_some_and(ProximityMonitor::is_triggered) {
            self.clock.advance(dt_unit);
        }
        self.frame += 1;

        let clock = &self.clock;
        let poses: Vec<(BodyId, Pose)> = self
            .bodies
            .iter_mut()
            .enumerate()
            .map(|(i, body)| (BodyId(i), body.update(clock)))
            .collect();

        let t = self.clock.t();
        let mut fired = None;
        if let Some(monitor) = self.proximity.as_mut() {
            let pursuer = &poses[monitor.pursuer.0].1;
            let target = &poses[monitor.target.0].1;
            if let Some(event) = monitor.check(t, pursuer, target) {
                self.clock.stop();
                info!(
                    "Proximity at t={:.3}: ({:.2}, {:.2}, {:.2}) separation {:.3}",
                    event.t, event.position.x, event.position.y, event.position.z, event.distance
                );
                fired = Some(event);
            }
        }

        FrameReport {
            frame: self.frame,
            t,
            state: self.clock.state(),
            poses,
            proximity: fired,
        }
    }

    /// Pose of `id` from the latest update (or from when it was added).
    pub fn current_pose(&self, id: BodyId) -> Result<Pose> {
        self.body(id).map(MovingBody::last_pose)
    }

    /// Trail polyline of `id`, oldest first; empty if the body has no trail.
    pub fn current_trail_points(&self, id: BodyId) -> Result<Vec<Vector3<f64>>> {
        Ok(self
            .body(id)?
            .trail()
            .map(|trail| trail.to_vec())
            .unwrap_or_default())
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.clock.set_speed(speed);
    }

    /// Starts the clock. Starting from the end rewinds to `t = 0`, which
    /// also clears the trails.
    pub fn start(&mut self) {
        if self.clock.start() {
            self.clear_trails();
            if let Some(monitor) = self.proximity.as_mut() {
                monitor.reset();
            }
        }
    }

    pub fn stop(&mut self) {
        self.clock.stop();
    }

    /// Start/stop button.
    pub fn toggle(&mut self) {
        if self.clock.is_running() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Back to `Idle` at `t = 0` with empty trails and no proximity event.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.clear_trails();
        if let Some(monitor) = self.proximity.as_mut() {
            monitor.reset();
        }
        self.resolve_all();
        info!("Scene reset: trails cleared, t=0");
    }

    /// Scrubs to `t`: pauses auto-advance and clears the trails so the
    /// polyline never jumps across the scrubbed gap.
    pub fn set_time(&mut self, t: f64) {
        self.clock.set_time(t);
        self.clear_trails();
        self.resolve_all();
        debug!("Scrubbed to t={:.3}", self.clock.t());
    }

    fn clear_trails(&mut self) {
        for body in &mut self.bodies {
            body.clear_trail();
        }
    }

    fn resolve_all(&mut self) {
        let t = self.clock.t();
        for body in &mut self.bodies {
            body.resolve(t);
        }
    }
}
