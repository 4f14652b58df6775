//! Normalized animation clock shared by every body in a scene.
//!
//! The clock advances `t` by `speed * dt_unit` per tick, where `dt_unit` is
//! a fixed per-frame increment rather than wall-clock time. `t` is always
//! within `[0, 1]` and lands exactly on `1.0` at the end of the run.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-tick increment used by [`SimulationClock::tick`].
pub const DEFAULT_TICK_UNIT: f64 = 0.01;

/// Initial speed multiplier.
pub const DEFAULT_SPEED: f64 = 0.25;

/// Speed range accepted from the control surface.
pub const DEFAULT_SPEED_RANGE: (f64, f64) = (0.05, 1.0);

/// What happens when `t` reaches the end of the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndPolicy {
    /// Stop running once `t` hits `1.0`
    #[default]
    StopAtEnd,
    /// Keep running with `t` pinned at `1.0`
    HoldAtEnd,
}

/// Observable clock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    /// Paused (or never started) before the end
    Idle,
    /// Advancing
    Running,
    /// Reached `t = 1.0` and stopped
    Completed,
}

/// Clock tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub speed: f64,
    pub tick_unit: f64,
    pub end_policy: EndPolicy,
    pub min_speed: f64,
    pub max_speed: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            tick_unit: DEFAULT_TICK_UNIT,
            end_policy: EndPolicy::StopAtEnd,
            min_speed: DEFAULT_SPEED_RANGE.0,
            max_speed: DEFAULT_SPEED_RANGE.1,
        }
    }
}

/// The single simulation clock of a scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationClock {
    t: f64,
    speed: f64,
    running: bool,
    tick_unit: f64,
    end_policy: EndPolicy,
    min_speed: f64,
    max_speed: f64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

impl SimulationClock {
    /// Creates an idle clock at `t = 0`.
    pub fn new(config: ClockConfig) -> Self {
        let (min_speed, max_speed) = match (config.min_speed, config.max_speed) {
            (lo, hi) if !lo.is_finite() || !hi.is_finite() => DEFAULT_SPEED_RANGE,
            (lo, hi) if lo <= hi => (lo, hi),
            (lo, hi) => (hi, lo),
        };

        let mut clock = Self {
            t: 0.0,
            speed: DEFAULT_SPEED,
            running: false,
            tick_unit: config.tick_unit.max(0.0),
            end_policy: config.end_policy,
            min_speed,
            max_speed,
        };
        clock.set_speed(config.speed);
        clock
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_unit(&self) -> f64 {
        self.tick_unit
    }

    pub fn end_policy(&self) -> EndPolicy {
        self.end_policy
    }

    /// True once `t` has reached `1.0`.
    pub fn is_at_end(&self) -> bool {
        self.t >= 1.0
    }

    pub fn state(&self) -> ClockState {
        if self.running {
            ClockState::Running
        } else if self.is_at_end() {
            ClockState::Completed
        } else {
            ClockState::Idle
        }
    }

    /// Starts advancing. Returns `true` if the clock was rewound to `0`
    /// because it was sitting at the end.
    pub fn start(&mut self) -> bool {
        let rewound = self.is_at_end();
        if rewound {
            self.t = 0.0;
        }
        self.running = true;
        debug!("Clock started at t={:.3} (rewound={})", self.t, rewound);
        rewound
    }

    /// Pauses at the current `t`.
    pub fn stop(&mut self) {
        self.running = false;
        debug!("Clock stopped at t={:.3}", self.t);
    }

    /// Start/stop button semantics. Returns `true` if a start rewound the clock.
    pub fn toggle(&mut self) -> bool {
        if self.running {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    /// Back to `Idle` at `t = 0`. Speed is kept.
    pub fn reset(&mut self) {
        self.t = 0.0;
        self.running = false;
    }

    /// Sets the speed multiplier, clamped into the configured range.
    /// Non-finite values are ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() {
            self.speed = speed.clamp(self.min_speed, self.max_speed);
        }
    }

    /// Scrubs to `t` (clamped) and pauses auto-advance.
    pub fn set_time(&mut self, t: f64) {
        self.t = crate::trajectory::clamp_param(t);
        self.running = false;
    }

    /// Advances by one fixed tick. Returns the new `t`.
    pub fn tick(&mut self) -> f64 {
        self.advance(self.tick_unit)
    }

    /// Advances by `speed * dt_unit` if running. Returns the new `t`.
    pub fn advance(&mut self, dt_unit: f64) -> f64 {
        if !self.running || !dt_unit.is_finite() || dt_unit <= 0.0 {
            return self.t;
        }

        self.t += self.speed * dt_unit;
        if self.t >= 1.0 {
            self.t = 1.0;
            if self.end_policy == EndPolicy::StopAtEnd {
                self.running = false;
                debug!("Clock reached end of path");
            }
        }
        self.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_speed_clock() -> SimulationClock {
        SimulationClock::new(ClockConfig {
            speed: 1.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_initial_state() {
        let clock = SimulationClock::default();
        assert_eq!(clock.state(), ClockState::Idle);
        assert_eq!(clock.t(), 0.0);
        assert_eq!(clock.speed(), DEFAULT_SPEED);
    }

    #[test]
    fn test_idle_clock_does_not_advance() {
        let mut clock = unit_speed_clock();
        clock.tick();
        assert_eq!(clock.t(), 0.0);
    }

    #[test]
    fn test_lifecycle_half_way() {
        let mut clock = unit_speed_clock();
        clock.start();
        for _ in 0..50 {
            clock.tick();
        }

        assert_relative_eq!(clock.t(), 0.5, epsilon = 1e-9);
        assert!(clock.is_running());
        assert_eq!(clock.state(), ClockState::Running);

        clock.reset();
        assert_eq!(clock.t(), 0.0);
        assert!(!clock.is_running());
        assert_eq!(clock.state(), ClockState::Idle);
    }

    #[test]
    fn test_large_step_clamps_exactly() {
        let mut clock = unit_speed_clock();
        clock.start();
        let t = clock.advance(1e9);

        assert_eq!(t, 1.0);
        assert_eq!(clock.state(), ClockState::Completed);
    }

    #[test]
    fn test_hold_at_end_keeps_running() {
        let mut clock = SimulationClock::new(ClockConfig {
            speed: 1.0,
            end_policy: EndPolicy::HoldAtEnd,
            ..Default::default()
        });
        clock.start();
        for _ in 0..500 {
            clock.tick();
        }

        assert_eq!(clock.t(), 1.0);
        assert!(clock.is_running());
    }

    #[test]
    fn test_stop_pauses_in_place() {
        let mut clock = unit_speed_clock();
        clock.start();
        for _ in 0..10 {
            clock.tick();
        }
        clock.stop();
        let paused_at = clock.t();
        clock.tick();

        assert_eq!(clock.t(), paused_at);
        assert_eq!(clock.state(), ClockState::Idle);
        assert!(!clock.start(), "Resuming mid-path must not rewind");
        assert_eq!(clock.t(), paused_at);
    }

    #[test]
    fn test_start_from_completed_rewinds() {
        let mut clock = unit_speed_clock();
        clock.start();
        clock.advance(200.0);
        assert_eq!(clock.state(), ClockState::Completed);

        assert!(clock.start());
        assert_eq!(clock.t(), 0.0);
        assert_eq!(clock.state(), ClockState::Running);
    }

    #[test]
    fn test_toggle() {
        let mut clock = SimulationClock::default();
        clock.toggle();
        assert!(clock.is_running());
        clock.toggle();
        assert!(!clock.is_running());
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut clock = SimulationClock::default();
        clock.set_speed(5.0);
        assert_eq!(clock.speed(), 1.0);
        clock.set_speed(0.0);
        assert_eq!(clock.speed(), 0.05);
        clock.set_speed(f64::NAN);
        assert_eq!(clock.speed(), 0.05);
    }

    #[test]
    fn test_non_finite_speed_range_uses_default() {
        for (min_speed, max_speed) in [
            (f64::NAN, 1.0),
            (0.05, f64::NAN),
            (f64::NEG_INFINITY, f64::INFINITY),
        ] {
            let mut clock = SimulationClock::new(ClockConfig {
                min_speed,
                max_speed,
                ..Default::default()
            });
            assert_eq!(clock.speed(), DEFAULT_SPEED);
            clock.set_speed(5.0);
            assert_eq!(clock.speed(), DEFAULT_SPEED_RANGE.1);
        }
    }

    #[test]
    fn test_inverted_speed_range_is_swapped() {
        let mut clock = SimulationClock::new(ClockConfig {
            min_speed: 2.0,
            max_speed: 0.5,
            ..Default::default()
        });
        clock.set_speed(3.0);
        assert_eq!(clock.speed(), 2.0);
    }

    #[test]
    fn test_set_time_pauses_and_clamps() {
        let mut clock = unit_speed_clock();
        clock.start();
        clock.set_time(1.7);

        assert_eq!(clock.t(), 1.0);
        assert!(!clock.is_running());

        clock.set_time(-0.3);
        assert_eq!(clock.t(), 0.0);
    }
}
