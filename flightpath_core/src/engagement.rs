//! Proximity check between a pursuer and its target.
//!
//! A plain distance threshold evaluated once per frame; no collision
//! response beyond latching the first hit.

use crate::body::{BodyId, Pose};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Distance below which two bodies count as having met.
pub const DEFAULT_PROXIMITY_THRESHOLD: f64 = 2.0;

/// First frame on which the pursuer came within range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityEvent {
    /// Clock parameter at the hit
    pub t: f64,
    /// Pursuer position at the hit
    pub position: Vector3<f64>,
    /// Separation at the hit
    pub distance: f64,
}

/// Watches the separation between two bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityMonitor {
    pub pursuer: BodyId,
    pub target: BodyId,
    threshold: f64,
    event: Option<ProximityEvent>,
}

impl ProximityMonitor {
    pub fn new(pursuer: BodyId, target: BodyId) -> Self {
        Self {
            pursuer,
            target,
            threshold: DEFAULT_PROXIMITY_THRESHOLD,
            event: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.set_threshold(threshold);
        self
    }

    /// Non-finite or negative thresholds are ignored.
    pub fn set_threshold(&mut self, threshold: f64) {
        if threshold.is_finite() && threshold >= 0.0 {
            self.threshold = threshold;
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Latched event, if the bodies have met since the last reset.
    pub fn event(&self) -> Option<ProximityEvent> {
        self.event
    }

    pub fn is_triggered(&self) -> bool {
        self.event.is_some()
    }

    /// Checks one frame. Returns the event only on the frame it first fires.
    pub fn check(&mut self, t: f64, pursuer: &Pose, target: &Pose) -> Option<ProximityEvent> {
        if self.event.is_some() {
            return None;
        }

        let distance = (pursuer.position - target.position).norm();
        if distance < self.threshold {
            let event = ProximityEvent {
                t,
                position: pursuer.position,
                distance,
            };
            self.event = Some(event);
            return Some(event);
        }
        None
    }

    pub fn reset(&mut self) {
        self.event = None;
    }
}
