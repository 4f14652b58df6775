//! The "ORIENTATION" Engine - tangent-aligned body frames.
//!
//! Turns a path tangent and a world-up reference into a right-handed body
//! frame whose local +X is the direction of travel, then applies the fixed
//! per-asset basis correction that aligns a model's native geometry with
//! that frame.
//!
//! Two choices are fixed here once for the whole crate:
//! - **Axis convention** ([`AxisConvention`]): body +Z is either the
//!   projected world up (`ZUp`) or its negation (`Ned`, +Z down). In both
//!   cases `Y = Z × X`, so the frame is always right-handed.
//! - **Composition order** ([`CompositionOrder`]): `path ⊗ basis` by default,
//!   i.e. motion first, asset fix second.

use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Squared length under which a direction is treated as degenerate.
pub const DEGENERATE_EPSILON: f64 = 1e-8;

/// `|up · forward|` above which up is considered parallel to forward.
pub const PARALLEL_DOT_LIMIT: f64 = 0.999;

/// Convention used when no configuration says otherwise.
pub const DEFAULT_CONVENTION: AxisConvention = AxisConvention::ZUp;

/// Composition order used when no configuration says otherwise.
pub const DEFAULT_COMPOSITION: CompositionOrder = CompositionOrder::PathThenBasis;

/// Body-axis convention for the solved frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisConvention {
    /// X forward, Z toward world up, Y = Z × X (left wing).
    #[default]
    ZUp,
    /// X forward, Z away from world up (down), Y = Z × X (right wing).
    Ned,
}

/// Order in which the model basis is multiplied onto the path orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionOrder {
    /// `path ⊗ basis`: the basis acts in the model's local frame.
    #[default]
    PathThenBasis,
    /// `basis ⊗ path`: the basis acts in the world frame.
    BasisThenPath,
}

/// Orthonormal body axes expressed in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFrame {
    /// Nose / direction of travel
    pub x: Vector3<f64>,
    /// Wing axis
    pub y: Vector3<f64>,
    /// Up (`ZUp`) or down (`Ned`) axis
    pub z: Vector3<f64>,
}

impl BodyFrame {
    /// Rotation matrix with columns `[X, Y, Z]`.
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[self.x, self.y, self.z]))
    }

    /// Equivalent unit quaternion (maps local +X onto `self.x`).
    pub fn to_quaternion(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_rotation_matrix(&self.rotation())
    }

    /// Checks unit length and pairwise orthogonality within `tol`.
    pub fn is_orthonormal(&self, tol: f64) -> bool {
        let unit = |v: &Vector3<f64>| (v.norm() - 1.0).abs() <= tol;
        unit(&self.x)
            && unit(&self.y)
            && unit(&self.z)
            && self.x.dot(&self.y).abs() <= tol
            && self.y.dot(&self.z).abs() <= tol
            && self.z.dot(&self.x).abs() <= tol
    }

    /// True when `X × Y = Z` (determinant +1).
    pub fn is_right_handed(&self, tol: f64) -> bool {
        (self.x.cross(&self.y) - self.z).norm() <= tol
    }
}

/// Builds body frames from a forward direction and a world-up reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSolver {
    pub convention: AxisConvention,
    /// Forward used when the supplied tangent is degenerate
    pub fallback_forward: Vector3<f64>,
    /// Up used when the supplied up vector is degenerate
    pub fallback_up: Vector3<f64>,
}

impl Default for FrameSolver {
    fn default() -> Self {
        Self::new(DEFAULT_CONVENTION)
    }
}

impl FrameSolver {
    pub fn new(convention: AxisConvention) -> Self {
        Self {
            convention,
            fallback_forward: Vector3::x(),
            fallback_up: Vector3::z(),
        }
    }

    /// Replaces the canonical forward used for degenerate tangents.
    pub fn with_fallback_forward(mut self, forward: Vector3<f64>) -> Self {
        self.fallback_forward = unit_or(forward, Vector3::x());
        self
    }

    /// Replaces the up axis used when the caller's up is degenerate.
    pub fn with_fallback_up(mut self, up: Vector3<f64>) -> Self {
        self.fallback_up = unit_or(up, Vector3::z());
        self
    }

    /// Solves the body frame for `forward` under `up`.
    ///
    /// Never fails: a degenerate forward uses `fallback_forward`, a
    /// degenerate or parallel up is replaced by a substitute axis.
    pub fn solve_frame(&self, forward: &Vector3<f64>, up: &Vector3<f64>) -> BodyFrame {
        let x = unit_or(*forward, unit_or(self.fallback_forward, Vector3::x()));

        let mut up_ref = unit_or(*up, unit_or(self.fallback_up, Vector3::z()));
        if up_ref.dot(&x).abs() > PARALLEL_DOT_LIMIT {
            up_ref = least_aligned_axis(&x);
            debug!("Up parallel to forward; substituting {:?}", up_ref.as_slice());
        }

        // Project up onto the plane orthogonal to X
        let projected = (up_ref - x * up_ref.dot(&x)).normalize();

        let z = match self.convention {
            AxisConvention::ZUp => projected,
            AxisConvention::Ned => -projected,
        };
        let y = z.cross(&x).normalize();

        BodyFrame { x, y, z }
    }

    /// Solves the frame and returns it as a unit quaternion.
    pub fn solve(&self, forward: &Vector3<f64>, up: &Vector3<f64>) -> UnitQuaternion<f64> {
        self.solve_frame(forward, up).to_quaternion()
    }
}

/// Fixed per-asset rotation aligning a model's native axes with the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelBasis {
    pub rotation: UnitQuaternion<f64>,
    pub order: CompositionOrder,
}

impl Default for ModelBasis {
    fn default() -> Self {
        Self::identity()
    }
}

impl ModelBasis {
    /// No correction.
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            order: DEFAULT_COMPOSITION,
        }
    }

    /// Wraps an existing rotation.
    pub fn new(rotation: UnitQuaternion<f64>) -> Self {
        Self {
            rotation,
            order: DEFAULT_COMPOSITION,
        }
    }

    /// Builds a basis from raw `(x, y, z, w)` components, normalizing them.
    ///
    /// A zero quaternion yields the identity.
    pub fn from_xyzw(x: f64, y: f64, z: f64, w: f64) -> Self {
        let q = Quaternion::new(w, x, y, z);
        if q.norm_squared() < DEGENERATE_EPSILON {
            return Self::identity();
        }
        Self::new(UnitQuaternion::from_quaternion(q))
    }

    /// Rotation of `angle` radians about `axis`.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        match nalgebra::Unit::try_new(*axis, DEGENERATE_EPSILON) {
            Some(axis) => Self::new(UnitQuaternion::from_axis_angle(&axis, angle)),
            None => Self::identity(),
        }
    }

    /// Overrides the composition order.
    pub fn with_order(mut self, order: CompositionOrder) -> Self {
        self.order = order;
        self
    }

    /// Chains another correction after this one (`self ⊗ other`).
    pub fn then(mut self, other: &ModelBasis) -> Self {
        self.rotation *= other.rotation;
        self
    }

    /// Composes the basis onto a solved path orientation.
    pub fn apply(&self, path: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
        match self.order {
            CompositionOrder::PathThenBasis => path * self.rotation,
            CompositionOrder::BasisThenPath => self.rotation * path,
        }
    }
}

/// Curvature-driven roll applied on top of the wings-level frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BankingPolicy {
    /// Roll radians per radian of heading change
    pub gain: f64,
    /// Roll limit in degrees (symmetric)
    pub max_bank_deg: f64,
}

impl BankingPolicy {
    pub fn new(gain: f64, max_bank_deg: f64) -> Self {
        Self { gain, max_bank_deg }
    }

    /// Local roll quaternion (about body +X) for a bank angle in radians.
    pub fn roll(bank: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), bank)
    }
}

/// Bank angle (radians) from two consecutive tangents.
///
/// A turn counter-clockwise about `up` (a left turn) yields a negative
/// roll, i.e. left wing down. Degenerate tangents give zero bank.
pub fn bank_angle(
    prev: &Vector3<f64>,
    next: &Vector3<f64>,
    up: &Vector3<f64>,
    policy: &BankingPolicy,
) -> f64 {
    let (Some(p), Some(n)) = (try_unit(prev), try_unit(next)) else {
        return 0.0;
    };

    let angle = p.dot(&n).clamp(-1.0, 1.0).acos();
    let sign = if p.cross(&n).dot(up) >= 0.0 { 1.0 } else { -1.0 };
    let max_bank = policy.max_bank_deg.abs().to_radians();

    (-policy.gain * sign * angle).clamp(-max_bank, max_bank)
}

/// Rotation taking NED world coordinates to Z-up world coordinates
/// (180° about +X: north stays +X, east becomes −Y, down becomes −Z).
pub fn ned_to_z_up_rotation() -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI)
}

/// Converts a NED world vector into Z-up world coordinates.
pub fn ned_to_z_up(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.x, -v.y, -v.z)
}

/// Converts a Z-up world vector into NED world coordinates.
pub fn z_up_to_ned(v: &Vector3<f64>) -> Vector3<f64> {
    // The conversion is its own inverse
    ned_to_z_up(v)
}

/// Unit vector along `v`, or `None` when `v` is non-finite or shorter
/// than the degeneracy threshold.
///
/// Components are rescaled by the largest magnitude first, so finite
/// vectors whose squared norm overflows still normalize.
pub fn try_unit(v: &Vector3<f64>) -> Option<Vector3<f64>> {
    if !v.iter().all(|c| c.is_finite()) || v.norm_squared() < DEGENERATE_EPSILON {
        return None;
    }
    let scaled = v / v.amax();
    let unit = scaled.normalize();
    unit.iter().all(|c| c.is_finite()).then_some(unit)
}

fn unit_or(v: Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    try_unit(&v).unwrap_or(fallback)
}

/// World axis with the smallest projection onto `x`.
fn least_aligned_axis(x: &Vector3<f64>) -> Vector3<f64> {
    let (ax, ay, az) = (x.x.abs(), x.y.abs(), x.z.abs());
    if az <= ax && az <= ay {
        Vector3::z()
    } else if ay <= ax {
        Vector3::y()
    } else {
        Vector3::x()
    }
}
