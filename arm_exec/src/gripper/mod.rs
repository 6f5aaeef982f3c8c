//! # Gripper module
//!
//! The gripper is a pair of fingers driven by a single servo, with a pressure
//! sensor read through one of the controller's analog inputs. Gripper
//! commands set a [`GripperState`], which is then evaluated once per cycle to
//! produce a new gripper servo angle.
//!
//! Finger separation is linear in the servo angle, from fully closed at -90
//! degrees to [`GRIPPER_RANGE_M`] at +90 degrees.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;
use std::collections::VecDeque;

// Internal
use comms_if::tc::gripper::GripperCmd;
use util::maths::{clamp, lin_map};

pub use state::GripperState;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Finger separation when fully open.
///
/// Units: meters
pub const GRIPPER_RANGE_M: f64 = 0.016;

/// Rate the gripper closes at while feeling for a pressure.
///
/// Units: degrees/second
pub const GRIP_RATE_DEGS: f64 = 45.0;

/// Longest time step used for a single slow closing movement.
///
/// Units: seconds
pub const MAX_GRIP_STEP_S: f64 = 0.1;

/// Units: degrees
pub const CLOSED_ANGLE_DEG: f64 = -90.0;

/// Units: degrees
pub const OPEN_ANGLE_DEG: f64 = 90.0;

/// Grip limit used until another is configured.
pub const DEFAULT_LIMIT_PRESSURE: f64 = 128.0;

/// Length of the pressure history.
///
/// Units: seconds
pub const PRESSURE_HISTORY_S: f64 = 10.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gripper controller.
#[derive(Debug, Clone)]
pub struct Gripper {
    state: GripperState,

    /// Pressure at which a grip is considered firm
    limit_pressure: f64,

    /// Time of the last state change or tick.
    ///
    /// Units: seconds
    last_change_s: f64,

    /// Units: meters
    finger_separation_m: f64,

    /// Most recent pressure reading
    pressure: Option<PressureReading>,

    /// Readings within the last [`PRESSURE_HISTORY_S`], oldest first
    history: VecDeque<PressureReading>,
}

/// A single timestamped pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PressureReading {
    pub value: f64,

    /// Units: seconds
    pub time_s: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Finger separation for a gripper servo angle.
///
/// Units: meters
pub fn separation_for_angle(angle_deg: f64) -> f64 {
    lin_map(
        (CLOSED_ANGLE_DEG, OPEN_ANGLE_DEG),
        (0.0, GRIPPER_RANGE_M),
        angle_deg,
    )
}

/// Gripper servo angle for a finger separation.
///
/// Units: degrees
pub fn angle_for_separation(separation_m: f64) -> f64 {
    lin_map(
        (0.0, GRIPPER_RANGE_M),
        (CLOSED_ANGLE_DEG, OPEN_ANGLE_DEG),
        separation_m,
    )
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Gripper {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT_PRESSURE, 0.0)
    }
}

impl Gripper {
    /// Create an idle gripper with its servo at `servo_angle_deg`.
    pub fn new(limit_pressure: f64, servo_angle_deg: f64) -> Self {
        Self {
            state: GripperState::Idle,
            limit_pressure,
            last_change_s: 0.0,
            finger_separation_m: separation_for_angle(servo_angle_deg),
            pressure: None,
            history: VecDeque::new(),
        }
    }

    pub fn state(&self) -> GripperState {
        self.state
    }

    pub fn limit_pressure(&self) -> f64 {
        self.limit_pressure
    }

    /// Units: meters
    pub fn finger_separation_m(&self) -> f64 {
        self.finger_separation_m
    }

    /// Latest pressure reading, if any has been received.
    pub fn pressure(&self) -> Option<PressureReading> {
        self.pressure
    }

    /// Pressure readings from the last [`PRESSURE_HISTORY_S`], oldest first.
    pub fn history(&self) -> impl Iterator<Item = &PressureReading> {
        self.history.iter()
    }

    /// Apply a gripper command received at `time_s`.
    pub fn command(&mut self, cmd: &GripperCmd, time_s: f64) {
        debug!("New Gripper GripperCmd::{:?}", cmd);

        let new_state = match *cmd {
            GripperCmd::Close => GripperState::Closing,
            GripperCmd::Open | GripperCmd::Release => GripperState::Opening,
            GripperCmd::GripToLimit { pressure } => GripperState::ClosingToPressure {
                pressure: pressure.unwrap_or(self.limit_pressure),
            },
            GripperCmd::CloseToDistance { distance_m } => GripperState::ClosingToDistance {
                distance_m: clamp_separation(distance_m),
            },
            GripperCmd::CloseToDistanceOrPressure {
                distance_m,
                pressure,
            } => GripperState::ClosingToDistanceOrPressure {
                distance_m: clamp_separation(distance_m),
                pressure,
            },
            GripperCmd::OpenToDistance { distance_m } => GripperState::OpeningToDistance {
                distance_m: clamp_separation(distance_m),
            },
            GripperCmd::SetLimit { pressure } => {
                self.limit_pressure = pressure;
                return;
            }
        };

        self.set_state(new_state, time_s);
    }

    /// Change state directly.
    pub fn set_state(&mut self, state: GripperState, time_s: f64) {
        self.state = state;
        self.last_change_s = time_s;
    }

    /// Halt any gripper motion.
    pub fn stop(&mut self, time_s: f64) {
        self.set_state(GripperState::Idle, time_s);
    }

    /// Record a new pressure reading, dropping history older than
    /// [`PRESSURE_HISTORY_S`].
    pub fn record_pressure(&mut self, value: f64, time_s: f64) {
        let reading = PressureReading { value, time_s };

        self.pressure = Some(reading);
        self.history.push_back(reading);

        while let Some(oldest) = self.history.front() {
            if time_s - oldest.time_s > PRESSURE_HISTORY_S {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Evaluate the gripper for this cycle.
    ///
    /// Returns the new gripper servo angle in degrees, or `None` if the servo
    /// shall not be moved.
    pub fn proc(&mut self, servo_angle_deg: f64, time_s: f64) -> Option<f64> {
        // Before any reading arrives nothing is being gripped
        let pressure = self.pressure.map(|r| r.value).unwrap_or(0.0);
        let elapsed_s = time_s - self.last_change_s;

        let (next, angle_deg) = self.state.step(servo_angle_deg, pressure, elapsed_s);

        if next != self.state && next.is_idle() {
            debug!("Gripper finished {:?}", self.state);
        }
        self.state = next;
        self.last_change_s = time_s;

        if let Some(a) = angle_deg {
            self.finger_separation_m = separation_for_angle(a);
        }

        angle_deg
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn clamp_separation(distance_m: f64) -> f64 {
    clamp(distance_m, 0.0, GRIPPER_RANGE_M).0
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_separation() {
        assert_eq!(separation_for_angle(-90.0), 0.0);
        assert!((separation_for_angle(90.0) - 0.016).abs() < 1e-12);
        assert!((separation_for_angle(0.0) - 0.008).abs() < 1e-12);
        assert!(angle_for_separation(0.008).abs() < 1e-9);
        assert!((angle_for_separation(separation_for_angle(33.0)) - 33.0).abs() < 1e-9);
    }

    #[test]
    fn test_grip_to_limit() {
        let mut gripper = Gripper::default();
        gripper.record_pressure(20.0, 0.0);

        gripper.command(&GripperCmd::GripToLimit { pressure: None }, 1.0);
        assert_eq!(
            gripper.state(),
            GripperState::ClosingToPressure { pressure: 128.0 }
        );

        // Closes a little each tick
        let a = gripper.proc(0.0, 1.1).unwrap();
        assert!((a + 4.5).abs() < 1e-9);
        let a = gripper.proc(a, 1.15).unwrap();
        assert!((a + 6.75).abs() < 1e-9);
        assert!(gripper.finger_separation_m() < 0.008);

        // Pressure builds, grip stops with no further command
        gripper.record_pressure(130.0, 1.2);
        assert_eq!(gripper.proc(a, 1.2), None);
        assert!(gripper.state().is_idle());
        assert_eq!(gripper.proc(a, 1.3), None);
    }

    #[test]
    fn test_commands() {
        let mut gripper = Gripper::default();

        gripper.command(&GripperCmd::SetLimit { pressure: 90.0 }, 0.0);
        assert_eq!(gripper.limit_pressure(), 90.0);
        assert!(gripper.state().is_idle());

        gripper.command(&GripperCmd::Release, 0.0);
        assert_eq!(gripper.proc(-90.0, 0.1), Some(90.0));
        assert!((gripper.finger_separation_m() - GRIPPER_RANGE_M).abs() < 1e-12);

        // Distances beyond the fingers' travel are limited
        gripper.command(&GripperCmd::OpenToDistance { distance_m: 0.5 }, 0.2);
        assert_eq!(
            gripper.state(),
            GripperState::OpeningToDistance {
                distance_m: GRIPPER_RANGE_M
            }
        );

        gripper.command(&GripperCmd::Close, 0.3);
        gripper.stop(0.3);
        assert_eq!(gripper.proc(0.0, 0.4), None);
    }

    #[test]
    fn test_pressure_history() {
        let mut gripper = Gripper::default();
        assert_eq!(gripper.pressure(), None);

        for i in 0..=120 {
            gripper.record_pressure(i as f64, i as f64 / 10.0);
        }

        let history: Vec<_> = gripper.history().collect();
        assert_eq!(history.last().map(|r| r.value), Some(120.0));
        assert!(history.iter().all(|r| 12.0 - r.time_s <= PRESSURE_HISTORY_S));
        assert!(history.len() >= 100 && history.len() <= 101);
        assert_eq!(
            gripper.pressure(),
            Some(PressureReading {
                value: 120.0,
                time_s: 12.0
            })
        );
    }
}
