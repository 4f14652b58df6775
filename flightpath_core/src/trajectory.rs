//! Parametric trajectories over normalized time `t ∈ [0, 1]`.
//!
//! Every trajectory is a pure function of `t`. The public entry point
//! [`Trajectory::position`] clamps its argument before evaluating, so a
//! caller can never push a shape outside its defined domain.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Squared length below which a finite difference is considered degenerate.
const TANGENT_EPSILON: f64 = 1e-12;

/// Clamps a path parameter into `[0, 1]`. NaN maps to `0.0`.
pub fn clamp_param(t: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}

/// Cosine ease-in/ease-out: `0.5 * (1 - cos(π t))`, flat at both ends.
pub fn ease_cos01(t: f64) -> f64 {
    0.5 * (1.0 - (PI * clamp_param(t)).cos())
}

/// A closed-form path `t → position`.
pub trait Trajectory {
    /// Raw evaluation. Implementations may assume `t ∈ [0, 1]`.
    fn evaluate(&self, t: f64) -> Vector3<f64>;

    /// Position at `t`, clamped into the domain first.
    fn position(&self, t: f64) -> Vector3<f64> {
        self.evaluate(clamp_param(t))
    }

    /// Finite-difference tangent at `t` (not normalized).
    ///
    /// Uses the forward difference and falls back to the backward one
    /// when the forward step collapses (at `t = 1`).
    fn tangent(&self, t: f64, step: f64) -> Vector3<f64> {
        let t = clamp_param(t);
        let p = self.position(t);
        let forward = self.position(t + step) - p;
        if forward.norm_squared() > TANGENT_EPSILON {
            return forward;
        }
        p - self.position(t - step)
    }
}

impl<T: Trajectory + ?Sized> Trajectory for Box<T> {
    fn evaluate(&self, t: f64) -> Vector3<f64> {
        (**self).evaluate(t)
    }
}

/// World axis selector for wave components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Unit vector along this axis.
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

/// Straight segment from `start` (t=0) to `end` (t=1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearPath {
    pub start: Vector3<f64>,
    pub end: Vector3<f64>,
}

impl LinearPath {
    pub fn new(start: Vector3<f64>, end: Vector3<f64>) -> Self {
        Self { start, end }
    }
}

impl Trajectory for LinearPath {
    fn evaluate(&self, t: f64) -> Vector3<f64> {
        self.start.lerp(&self.end, t)
    }
}

/// Sinusoidal perturbation `amplitude * sin(cycles * 2π * t)` along one axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Wave {
    pub axis: Axis,
    pub amplitude: f64,
    pub cycles: f64,
}

impl Wave {
    pub fn new(axis: Axis, amplitude: f64, cycles: f64) -> Self {
        Self {
            axis,
            amplitude,
            cycles,
        }
    }

    /// Offset contributed at `t`.
    pub fn offset(&self, t: f64) -> Vector3<f64> {
        self.axis.unit() * (self.amplitude * (self.cycles * 2.0 * PI * t).sin())
    }
}

/// Linear travel plus any number of sinusoidal waves.
///
/// `origin + travel * t + Σ wave(t)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavePath {
    pub origin: Vector3<f64>,
    pub travel: Vector3<f64>,
    pub waves: Vec<Wave>,
}

impl WavePath {
    pub fn new(origin: Vector3<f64>, travel: Vector3<f64>) -> Self {
        Self {
            origin,
            travel,
            waves: Vec::new(),
        }
    }

    /// Adds a wave component.
    pub fn with_wave(mut self, wave: Wave) -> Self {
        self.waves.push(wave);
        self
    }
}

impl Trajectory for WavePath {
    fn evaluate(&self, t: f64) -> Vector3<f64> {
        self.waves
            .iter()
            .fold(self.origin + self.travel * t, |acc, wave| acc + wave.offset(t))
    }
}

/// Linear travel plus an eased displacement.
///
/// `origin + travel * t + ease * ease_cos01(t)`; the eased part starts and
/// ends with zero velocity, which gives the arc-like climbs and turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EasedArc {
    pub origin: Vector3<f64>,
    pub travel: Vector3<f64>,
    pub ease: Vector3<f64>,
}

impl EasedArc {
    pub fn new(origin: Vector3<f64>, travel: Vector3<f64>, ease: Vector3<f64>) -> Self {
        Self {
            origin,
            travel,
            ease,
        }
    }
}

impl Trajectory for EasedArc {
    fn evaluate(&self, t: f64) -> Vector3<f64> {
        self.origin + self.travel * t + self.ease * ease_cos01(t)
    }
}

/// Adapter turning any closure into a [`Trajectory`].
pub struct FnTrajectory<F>(pub F);

impl<F> Trajectory for FnTrajectory<F>
where
    F: Fn(f64) -> Vector3<f64>,
{
    fn evaluate(&self, t: f64) -> Vector3<f64> {
        (self.0)(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clamp_param() {
        assert_eq!(clamp_param(-3.0), 0.0);
        assert_eq!(clamp_param(0.25), 0.25);
        assert_eq!(clamp_param(7.0), 1.0);
        assert_eq!(clamp_param(f64::NAN), 0.0);
    }

    #[test]
    fn test_ease_endpoints() {
        assert_relative_eq!(ease_cos01(0.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(ease_cos01(0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(ease_cos01(1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(ease_cos01(2.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_position_is_clamped() {
        let path = LinearPath::new(Vector3::new(-10.0, 0.0, 0.0), Vector3::new(10.0, 0.0, 0.0));

        assert_eq!(path.position(-1.0), path.position(0.0));
        assert_eq!(path.position(5.0), path.position(1.0));
        assert_relative_eq!(path.position(0.5).x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_determinism() {
        let path = WavePath::new(Vector3::new(-120.0, 0.0, 0.0), Vector3::new(240.0, 0.0, 0.0))
            .with_wave(Wave::new(Axis::Y, 15.0, 1.5))
            .with_wave(Wave::new(Axis::Z, 15.0, 1.5));

        for i in 0..=20 {
            let t = i as f64 / 20.0;
            assert_eq!(path.position(t), path.position(t));
        }
    }

    #[test]
    fn test_wave_path_values() {
        let path = WavePath::new(Vector3::new(-120.0, 0.0, 0.0), Vector3::new(240.0, 0.0, 0.0))
            .with_wave(Wave::new(Axis::Y, 15.0, 1.5));

        // Quarter of the first cycle: sin(π/2) = 1
        let t = 1.0 / 6.0;
        let p = path.position(t);
        assert_relative_eq!(p.x, -120.0 + 240.0 * t, epsilon = 1e-9);
        assert_relative_eq!(p.y, 15.0, epsilon = 1e-9);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eased_arc_endpoints() {
        let arc = EasedArc::new(
            Vector3::new(-60.0, 0.0, 5.0),
            Vector3::new(120.0, 0.0, 0.0),
            Vector3::new(0.0, 20.0, 8.0),
        );

        let start = arc.position(0.0);
        let end = arc.position(1.0);
        assert_relative_eq!(start, Vector3::new(-60.0, 0.0, 5.0), epsilon = 1e-9);
        assert_relative_eq!(end, Vector3::new(60.0, 20.0, 13.0), epsilon = 1e-9);
    }

    #[test]
    fn test_tangent_falls_back_at_end() {
        let path = LinearPath::new(Vector3::zeros(), Vector3::new(0.0, 4.0, 0.0));

        let mid = path.tangent(0.5, 0.01);
        let end = path.tangent(1.0, 0.01);

        assert!(mid.y > 0.0);
        assert!(end.y > 0.0, "Backward difference should keep the direction at t=1");
        assert_relative_eq!(end.normalize(), Vector3::y(), epsilon = 1e-9);
    }

    #[test]
    fn test_fn_trajectory() {
        let path = FnTrajectory(|t: f64| Vector3::new(t, t * t, 0.0));
        assert_relative_eq!(path.position(0.5).y, 0.25, epsilon = 1e-12);
        assert_relative_eq!(path.position(3.0).y, 1.0, epsilon = 1e-12);
    }
}
