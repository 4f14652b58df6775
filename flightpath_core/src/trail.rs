//! Capped, decimated polyline trail.
//!
//! Points arrive in time order. A point closer than `min_segment_distance`
//! to the last stored point is dropped, and once the trail holds more than
//! `max_points` the oldest points are evicted from the front.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default cap on stored points.
pub const DEFAULT_MAX_POINTS: usize = 2000;

/// Default minimum spacing between consecutive points.
pub const DEFAULT_MIN_SEGMENT: f64 = 0.2;

/// Append-only polyline with decimation and a point cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trail {
    points: VecDeque<Vector3<f64>>,
    max_points: usize,
    min_segment_distance: f64,
}

impl Default for Trail {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POINTS, DEFAULT_MIN_SEGMENT)
    }
}

impl Trail {
    /// Creates an empty trail. `max_points` is raised to at least 1.
    pub fn new(max_points: usize, min_segment_distance: f64) -> Self {
        let max_points = max_points.max(1);
        Self {
            points: VecDeque::with_capacity(max_points.min(DEFAULT_MAX_POINTS) + 1),
            max_points,
            min_segment_distance: min_segment_distance.max(0.0),
        }
    }

    /// Appends `point` unless it is within `min_segment_distance` of the last
    /// stored point. Returns whether the point was stored.
    ///
    /// Non-finite points are never stored.
    pub fn add(&mut self, point: Vector3<f64>) -> bool {
        if !point.iter().all(|c| c.is_finite()) {
            return false;
        }

        if let Some(last) = self.points.back() {
            if (point - last).norm() < self.min_segment_distance {
                return false;
            }
        }

        self.points.push_back(point);
        while self.points.len() > self.max_points {
            self.points.pop_front();
        }
        true
    }

    /// Removes all points; the next `add` is unconditional.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn min_segment_distance(&self) -> f64 {
        self.min_segment_distance
    }

    /// Most recently stored point.
    pub fn last(&self) -> Option<&Vector3<f64>> {
        self.points.back()
    }

    /// Points oldest first.
    pub fn points(&self) -> impl Iterator<Item = &Vector3<f64>> + '_ {
        self.points.iter()
    }

    /// Copies the points into a contiguous buffer for line-strip rendering.
    pub fn to_vec(&self) -> Vec<Vector3<f64>> {
        self.points.iter().copied().collect()
    }

    /// Total length of the polyline.
    pub fn polyline_length(&self) -> f64 {
        self.points
            .iter()
            .zip(self.points.iter().skip(1))
            .map(|(a, b)| (b - a).norm())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_first_point_is_unconditional() {
        let mut trail = Trail::new(10, 5.0);
        assert!(trail.add(Vector3::zeros()));
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn test_identical_points_are_decimated() {
        let mut trail = Trail::new(100, 0.2);
        for _ in 0..50 {
            trail.add(Vector3::new(1.0, 2.0, 3.0));
        }
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn test_points_within_min_segment_are_decimated() {
        let mut trail = Trail::new(100, 1.0);
        for i in 0..20 {
            trail.add(Vector3::new(0.04 * i as f64, 0.0, 0.0));
        }
        // Max spread 0.76 < 1.0 from the first point
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn test_spaced_points_are_all_stored() {
        let min = 0.2;
        let step = min + 1e-6;
        let mut trail = Trail::new(1000, min);

        for i in 0..100 {
            assert!(trail.add(Vector3::new(step * i as f64, 0.0, 0.0)));
        }
        assert_eq!(trail.len(), 100);
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let max = 50;
        let extra = 17;
        let mut trail = Trail::new(max, 0.1);

        for i in 0..(max + extra) {
            trail.add(Vector3::new(i as f64, 0.0, 0.0));
        }

        assert_eq!(trail.len(), max);
        let xs: Vec<f64> = trail.points().map(|p| p.x).collect();
        let expected: Vec<f64> = (extra..max + extra).map(|i| i as f64).collect();
        assert_eq!(xs, expected);
    }

    #[test]
    fn test_clear_resets_last_point() {
        let mut trail = Trail::new(10, 10.0);
        trail.add(Vector3::zeros());
        trail.clear();

        assert!(trail.is_empty());
        assert!(trail.last().is_none());
        assert!(trail.add(Vector3::new(0.1, 0.0, 0.0)));
    }

    #[test]
    fn test_non_finite_points_rejected() {
        let mut trail = Trail::default();
        assert!(!trail.add(Vector3::new(f64::NAN, 0.0, 0.0)));
        assert!(!trail.add(Vector3::new(0.0, f64::INFINITY, 0.0)));
        assert!(trail.is_empty());
    }

    #[test]
    fn test_zero_cap_is_raised() {
        let mut trail = Trail::new(0, 0.0);
        trail.add(Vector3::x());
        trail.add(Vector3::y());
        assert_eq!(trail.max_points(), 1);
        assert_eq!(trail.to_vec(), vec![Vector3::y()]);
    }

    #[test]
    fn test_polyline_length() {
        let mut trail = Trail::new(10, 0.0);
        trail.add(Vector3::zeros());
        trail.add(Vector3::new(3.0, 0.0, 0.0));
        trail.add(Vector3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(trail.polyline_length(), 7.0, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_trail_respects_cap_and_spacing(
            max in 1usize..64,
            min in 0.0..2.0f64,
            steps in proptest::collection::vec((-3.0..3.0f64, -3.0..3.0f64, -3.0..3.0f64), 0..200),
        ) {
            let mut trail = Trail::new(max, min);
            let mut p = Vector3::zeros();
            for (dx, dy, dz) in steps {
                p += Vector3::new(dx, dy, dz);
                trail.add(p);
            }

            prop_assert!(trail.len() <= max);
            let pts = trail.to_vec();
            for pair in pts.windows(2) {
                prop_assert!((pair[1] - pair[0]).norm() >= min);
            }
        }
    }
}
