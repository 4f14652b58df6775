//! Moving bodies: a trajectory resolved to a pose every frame.
//!
//! A [`MovingBody`] owns everything needed to turn the shared clock's `t`
//! into a [`Pose`]: the trajectory, the frame solver, the model basis, an
//! optional banking policy and trail, and an optional [`PoseSink`] standing
//! in for the renderer-side transform it drives.

use crate::clock::SimulationClock;
use crate::orientation::{
    bank_angle, try_unit, BankingPolicy, FrameSolver, ModelBasis, DEGENERATE_EPSILON,
};
use crate::trail::Trail;
use crate::trajectory::{clamp_param, Trajectory};

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// Default parameter step for finite-difference tangents.
pub const DEFAULT_TANGENT_STEP: f64 = 0.02;

/// Handle of a body inside a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub usize);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// World placement of a body for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl Pose {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Local +X expressed in world coordinates.
    pub fn forward(&self) -> Vector3<f64> {
        self.orientation * Vector3::x()
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.orientation.coords.iter().all(|c| c.is_finite())
    }
}

/// Receives the pose of a body once per frame.
pub trait PoseSink {
    fn apply(&mut self, pose: &Pose);
}

/// Cloneable, single-threaded transform slot a renderer can read back.
#[derive(Debug, Clone, Default)]
pub struct TransformHandle(Rc<RefCell<Pose>>);

impl TransformHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last pose written by the owning body.
    pub fn get(&self) -> Pose {
        *self.0.borrow()
    }
}

impl PoseSink for TransformHandle {
    fn apply(&mut self, pose: &Pose) {
        *self.0.borrow_mut() = *pose;
    }
}

/// A body following a parametric trajectory.
pub struct MovingBody {
    name: String,
    trajectory: Box<dyn Trajectory>,
    basis: ModelBasis,
    solver: FrameSolver,
    world_up: Vector3<f64>,
    tail_offset: f64,
    tangent_step: f64,
    banking: Option<BankingPolicy>,
    trail: Option<Trail>,
    sink: Option<Box<dyn PoseSink>>,

    /// Last non-degenerate direction of travel
    last_forward: Vector3<f64>,
    /// Set while the path gives no usable tangent
    stationary: bool,
    last_pose: Pose,
    last_bank: f64,
}

impl MovingBody {
    /// Creates a body with identity basis, default solver and +Z world up.
    pub fn new(name: impl Into<String>, trajectory: impl Trajectory + 'static) -> Self {
        let solver = FrameSolver::default();
        let mut body = Self {
            name: name.into(),
            trajectory: Box::new(trajectory),
            basis: ModelBasis::identity(),
            last_forward: solver.fallback_forward,
            stationary: false,
            solver,
            world_up: Vector3::z(),
            tail_offset: 0.0,
            tangent_step: DEFAULT_TANGENT_STEP,
            banking: None,
            trail: None,
            sink: None,
            last_pose: Pose::default(),
            last_bank: 0.0,
        };
        body.resolve(0.0);
        body
    }

    pub fn with_basis(mut self, basis: ModelBasis) -> Self {
        self.basis = basis;
        self.resolve(0.0);
        self
    }

    pub fn with_solver(mut self, solver: FrameSolver) -> Self {
        self.last_forward = solver.fallback_forward;
        self.solver = solver;
        self.resolve(0.0);
        self
    }

    /// World up reference; a degenerate vector is left to the solver's fallback.
    pub fn with_world_up(mut self, up: Vector3<f64>) -> Self {
        self.world_up = up;
        self.resolve(0.0);
        self
    }

    /// Distance behind the body (along its path forward) of the trail sample.
    pub fn with_tail_offset(mut self, offset: f64) -> Self {
        self.tail_offset = offset;
        self
    }

    pub fn with_tangent_step(mut self, step: f64) -> Self {
        if step.is_finite() && step > 0.0 {
            self.tangent_step = step;
        }
        self
    }

    pub fn with_banking(mut self, policy: BankingPolicy) -> Self {
        self.banking = Some(policy);
        self
    }

    pub fn with_trail(mut self, trail: Trail) -> Self {
        self.trail = Some(trail);
        self
    }

    /// Injects the transform this body drives.
    pub fn with_sink(mut self, sink: impl PoseSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trajectory(&self) -> &dyn Trajectory {
        self.trajectory.as_ref()
    }

    pub fn basis(&self) -> &ModelBasis {
        &self.basis
    }

    pub fn tail_offset(&self) -> f64 {
        self.tail_offset
    }

    pub fn trail(&self) -> Option<&Trail> {
        self.trail.as_ref()
    }

    /// Pose from the most recent resolve.
    pub fn last_pose(&self) -> Pose {
        self.last_pose
    }

    /// Bank angle (radians) from the most recent resolve.
    pub fn last_bank(&self) -> f64 {
        self.last_bank
    }

    /// Path direction of travel from the most recent resolve.
    pub fn last_forward(&self) -> Vector3<f64> {
        self.last_forward
    }

    /// Whether the latest resolve found no usable tangent.
    pub fn is_stationary(&self) -> bool {
        self.stationary
    }

    /// Trail sample point for the most recent pose.
    pub fn tail_point(&self) -> Vector3<f64> {
        self.last_pose.position - self.last_forward * self.tail_offset
    }

    pub fn clear_trail(&mut self) {
        if let Some(trail) = self.trail.as_mut() {
            trail.clear();
        }
    }

    /// Computes the pose at `t` without touching the trail or sink.
    ///
    /// When the path is momentarily stationary the previous direction of
    /// travel is reused, so the body never snaps to an arbitrary heading.
    pub fn resolve(&mut self, t: f64) -> Pose {
        let t = clamp_param(t);
        let h = self.tangent_step;

        let p1 = self.trajectory.position(t);
        let next = self.trajectory.tangent(t, h);
        let mut prev = p1 - self.trajectory.position(t - h);
        if prev.norm_squared() < DEGENERATE_EPSILON {
            prev = next;
        }

        match try_unit(&next) {
            Some(forward) => {
                self.last_forward = forward;
                self.stationary = false;
            }
            None if !self.stationary => {
                warn!("{}: stationary at t={:.4}, keeping previous heading", self.name, t);
                self.stationary = true;
            }
            None => {}
        }

        let level = self.solver.solve(&self.last_forward, &self.world_up);
        let bank = self
            .banking
            .as_ref()
            .map(|policy| bank_angle(&prev, &next, &self.world_up, policy))
            .unwrap_or(0.0);
        let path = level * BankingPolicy::roll(bank);

        self.last_bank = bank;
        self.last_pose = Pose::new(p1, self.basis.apply(&path));
        self.last_pose
    }

    /// Per-frame update: resolve at the clock's `t`, record the trail
    /// sample, and push the pose into the injected transform.
    pub fn update(&mut self, clock: &SimulationClock) -> Pose {
        let pose = self.resolve(clock.t());
        let tail = self.tail_point();

        if let Some(trail) = self.trail.as_mut() {
            trail.add(tail);
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.apply(&pose);
        }

        pose
    }
}
