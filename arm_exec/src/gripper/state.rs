//! Gripper state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::{
    angle_for_separation, separation_for_angle, CLOSED_ANGLE_DEG, GRIP_RATE_DEGS,
    MAX_GRIP_STEP_S, OPEN_ANGLE_DEG,
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the gripper is currently trying to do.
///
/// Distances are finger separations in meters, pressures raw sensor values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GripperState {
    Idle,
    Closing,
    ClosingToPressure { pressure: f64 },
    ClosingToDistance { distance_m: f64 },
    ClosingToDistanceOrPressure { distance_m: f64, pressure: f64 },
    Opening,
    OpeningToDistance { distance_m: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GripperState {
    fn default() -> Self {
        GripperState::Idle
    }
}

impl GripperState {
    /// Returns true if the state will not produce any further commands.
    pub fn is_idle(&self) -> bool {
        *self == GripperState::Idle
    }

    /// Evaluate one tick of the state machine.
    ///
    /// Given the current gripper servo angle (degrees), the latest pressure
    /// reading and the time since the last tick, returns the next state and
    /// the servo angle to command, if any.
    pub fn step(
        self,
        servo_angle_deg: f64,
        pressure: f64,
        elapsed_s: f64,
    ) -> (GripperState, Option<f64>) {
        match self {
            GripperState::Idle => (GripperState::Idle, None),

            GripperState::Closing => (GripperState::Idle, Some(CLOSED_ANGLE_DEG)),

            GripperState::Opening => (GripperState::Idle, Some(OPEN_ANGLE_DEG)),

            GripperState::ClosingToDistance { distance_m }
            | GripperState::OpeningToDistance { distance_m } => {
                (GripperState::Idle, Some(angle_for_separation(distance_m)))
            }

            GripperState::ClosingToPressure { pressure: limit } => {
                if pressure >= limit {
                    return (GripperState::Idle, None);
                }

                let new_angle_deg = close_step(servo_angle_deg, elapsed_s);

                if new_angle_deg <= CLOSED_ANGLE_DEG {
                    (GripperState::Idle, Some(CLOSED_ANGLE_DEG))
                } else {
                    (self, Some(new_angle_deg))
                }
            }

            GripperState::ClosingToDistanceOrPressure {
                distance_m,
                pressure: limit,
            } => {
                if pressure >= limit {
                    return (GripperState::Idle, None);
                }

                let new_angle_deg = close_step(servo_angle_deg, elapsed_s);

                if separation_for_angle(new_angle_deg) <= distance_m {
                    (GripperState::Idle, Some(angle_for_separation(distance_m)))
                } else if new_angle_deg <= CLOSED_ANGLE_DEG {
                    (GripperState::Idle, Some(CLOSED_ANGLE_DEG))
                } else {
                    (self, Some(new_angle_deg))
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Slow closing movement over one tick, limited so a late tick can't
/// overgrip.
fn close_step(servo_angle_deg: f64, elapsed_s: f64) -> f64 {
    servo_angle_deg - GRIP_RATE_DEGS * elapsed_s.min(MAX_GRIP_STEP_S).max(0.0)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_immediate_states() {
        assert_eq!(GripperState::Idle.step(10.0, 0.0, 0.1), (GripperState::Idle, None));
        assert_eq!(
            GripperState::Closing.step(10.0, 0.0, 0.1),
            (GripperState::Idle, Some(-90.0))
        );
        assert_eq!(
            GripperState::Opening.step(10.0, 0.0, 0.1),
            (GripperState::Idle, Some(90.0))
        );

        let (next, angle) = GripperState::OpeningToDistance { distance_m: 0.012 }.step(0.0, 0.0, 0.1);
        assert!(next.is_idle());
        assert!((angle.unwrap() - 45.0).abs() < EPS);

        let (next, angle) = GripperState::ClosingToDistance { distance_m: 0.0 }.step(0.0, 0.0, 0.1);
        assert!(next.is_idle());
        assert!((angle.unwrap() + 90.0).abs() < EPS);
    }

    #[test]
    fn test_closing_to_pressure() {
        let state = GripperState::ClosingToPressure { pressure: 200.0 };

        // Below the limit, close slowly and keep going
        let (next, angle) = state.step(10.0, 150.0, 0.05);
        assert_eq!(next, state);
        assert!((angle.unwrap() - 7.75).abs() < EPS);

        // Step size is capped
        let (_, angle) = state.step(10.0, 150.0, 2.0);
        assert!((angle.unwrap() - 5.5).abs() < EPS);

        // Pressure reached, stop without commanding anything
        assert_eq!(state.step(7.75, 200.0, 0.05), (GripperState::Idle, None));
        assert_eq!(state.step(7.75, 230.0, 0.05), (GripperState::Idle, None));

        // Fully closed before reaching the pressure
        assert_eq!(
            state.step(-88.0, 10.0, 0.1),
            (GripperState::Idle, Some(-90.0))
        );
    }

    #[test]
    fn test_closing_to_distance_or_pressure() {
        let state = GripperState::ClosingToDistanceOrPressure {
            distance_m: 0.008,
            pressure: 200.0,
        };

        // Far from both limits
        let (next, angle) = state.step(20.0, 50.0, 0.1);
        assert_eq!(next, state);
        assert!((angle.unwrap() - 15.5).abs() < EPS);

        // Passing the separation snaps to it
        let (next, angle) = state.step(1.0, 50.0, 0.1);
        assert!(next.is_idle());
        assert!(angle.unwrap().abs() < EPS);

        // Pressure wins
        assert_eq!(state.step(20.0, 210.0, 0.1), (GripperState::Idle, None));
    }
}
