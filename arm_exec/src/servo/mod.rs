//! # Servo model
//!
//! Each joint of the arm is driven by a hobby servo. A [`JointActuator`]
//! describes one of them: the board channel it is plugged into, its travel
//! limits, how fast it turns and the calibration curve mapping a physical
//! angle to the pulse width demanded from the controller.
//!
//! The calibration is two independent straight lines meeting at the centre:
//!
//! ```text
//!   low  ->  500 us
//!   centre -> 1500 us
//!   high -> 2500 us
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use comms_if::eqpt::ssc::{ServoCommand, CENTRE_PULSE_WIDTH_US};
use util::maths::{clamp, lin_map};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Pulse width at the low calibration point.
///
/// Units: microseconds
pub const LOW_PULSE_WIDTH_US: i32 = 500;

/// Pulse width at the high calibration point.
///
/// Units: microseconds
pub const HIGH_PULSE_WIDTH_US: i32 = 2500;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Three point angle calibration of a servo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Angle commanded by a 1500 us pulse.
    ///
    /// Units: radians
    pub centre_rad: f64,

    /// Angle commanded by a 500 us pulse.
    ///
    /// Units: radians
    pub low_rad: f64,

    /// Angle commanded by a 2500 us pulse.
    ///
    /// Units: radians
    pub high_rad: f64,
}

/// A single servo driven joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointActuator {
    pub name: String,

    /// Controller board channel
    pub channel: u8,

    /// Units: radians
    pub min_angle_rad: f64,

    /// Units: radians
    pub max_angle_rad: f64,

    /// Time taken to turn through 60 degrees with no load, as given on servo
    /// datasheets.
    ///
    /// Units: seconds
    pub speed_s_per_60_deg: f64,

    #[serde(default)]
    pub calibration: Calibration,

    /// True if the servo turns the opposite way to the joint.
    #[serde(default)]
    pub inverted: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in a servo definition.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ServoError {
    #[error("Servo {0}: calibration must satisfy low < centre < high")]
    InvalidCalibration(String),

    #[error("Servo {0}: minimum angle is greater than the maximum angle")]
    InvalidLimits(String),

    #[error("Servo {0}: speed must be positive")]
    InvalidSpeed(String),

    #[error("Servo {name}: channel {channel} is outside the board's range")]
    InvalidChannel { name: String, channel: u8 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Calibration {
    fn default() -> Self {
        Self {
            centre_rad: 0.0,
            low_rad: -std::f64::consts::FRAC_PI_2,
            high_rad: std::f64::consts::FRAC_PI_2,
        }
    }
}

impl Calibration {
    fn is_valid(&self) -> bool {
        self.low_rad < self.centre_rad && self.centre_rad < self.high_rad
    }
}

impl JointActuator {
    /// Check the definition is usable.
    pub fn validate(&self) -> Result<(), ServoError> {
        if !self.calibration.is_valid() {
            return Err(ServoError::InvalidCalibration(self.name.clone()));
        }
        if self.min_angle_rad > self.max_angle_rad {
            return Err(ServoError::InvalidLimits(self.name.clone()));
        }
        if !(self.speed_s_per_60_deg > 0.0) {
            return Err(ServoError::InvalidSpeed(self.name.clone()));
        }
        if self.channel > comms_if::eqpt::ssc::MAX_CHANNEL {
            return Err(ServoError::InvalidChannel {
                name: self.name.clone(),
                channel: self.channel,
            });
        }

        Ok(())
    }

    /// Maximum turning rate.
    ///
    /// Units: degrees/second
    pub fn rotate_rate_degs(&self) -> f64 {
        60.0 / self.speed_s_per_60_deg
    }

    /// Pulse width which moves the servo to `angle_rad`.
    ///
    /// Angles beyond the calibration points are extrapolated, the result is
    /// truncated to whole microseconds.
    pub fn pulse_width_for_angle(&self, angle_rad: f64) -> i32 {
        let cal = &self.calibration;

        let pulse_us = if angle_rad < cal.centre_rad {
            lin_map(
                (cal.centre_rad, cal.low_rad),
                (CENTRE_PULSE_WIDTH_US as f64, LOW_PULSE_WIDTH_US as f64),
                angle_rad,
            )
        } else {
            lin_map(
                (cal.centre_rad, cal.high_rad),
                (CENTRE_PULSE_WIDTH_US as f64, HIGH_PULSE_WIDTH_US as f64),
                angle_rad,
            )
        };

        pulse_us as i32
    }

    /// Angle the servo moves to for `pulse_width_us`.
    ///
    /// Units: radians
    pub fn angle_for_pulse_width(&self, pulse_width_us: i32) -> f64 {
        let cal = &self.calibration;
        let pulse_us = pulse_width_us as f64;

        if pulse_width_us < CENTRE_PULSE_WIDTH_US {
            lin_map(
                (CENTRE_PULSE_WIDTH_US as f64, LOW_PULSE_WIDTH_US as f64),
                (cal.centre_rad, cal.low_rad),
                pulse_us,
            )
        } else {
            lin_map(
                (CENTRE_PULSE_WIDTH_US as f64, HIGH_PULSE_WIDTH_US as f64),
                (cal.centre_rad, cal.high_rad),
                pulse_us,
            )
        }
    }

    /// Limit a joint angle to the servo's travel.
    ///
    /// Returns the limited angle and whether it was changed.
    pub fn clamp_joint_deg(&self, joint_deg: f64) -> (f64, bool) {
        clamp(
            joint_deg,
            self.min_angle_rad.to_degrees(),
            self.max_angle_rad.to_degrees(),
        )
    }

    /// Returns true if the joint angle is within the servo's travel.
    pub fn in_limits_deg(&self, joint_deg: f64) -> bool {
        !self.clamp_joint_deg(joint_deg).1
    }

    /// Servo angle for a joint angle, accounting for inversion.
    ///
    /// Units: radians
    pub fn servo_angle_rad(&self, joint_deg: f64) -> f64 {
        let angle_rad = joint_deg.to_radians();

        if self.inverted {
            -angle_rad
        } else {
            angle_rad
        }
    }

    /// Build the command moving this joint to `joint_deg`.
    pub fn command_for_joint_deg(&self, joint_deg: f64) -> ServoCommand {
        ServoCommand::new(
            self.channel,
            self.pulse_width_for_angle(self.servo_angle_rad(joint_deg)),
        )
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn servo(inverted: bool) -> JointActuator {
        JointActuator {
            name: String::from("elbow"),
            channel: 2,
            min_angle_rad: -1.0,
            max_angle_rad: 1.2,
            speed_s_per_60_deg: 0.23,
            calibration: Calibration::default(),
            inverted,
        }
    }

    #[test]
    fn test_default_calibration() {
        let s = servo(false);

        assert_eq!(s.pulse_width_for_angle(0.0), 1500);
        assert_eq!(s.pulse_width_for_angle(-std::f64::consts::FRAC_PI_2), 500);
        assert_eq!(s.pulse_width_for_angle(std::f64::consts::FRAC_PI_2), 2500);
        assert_eq!(s.pulse_width_for_angle(std::f64::consts::FRAC_PI_4), 2000);
        assert_eq!(s.pulse_width_for_angle(-std::f64::consts::FRAC_PI_4), 1000);

        // Truncated, not rounded
        assert_eq!(s.pulse_width_for_angle(30f64.to_radians()), 1833);
        assert_eq!(s.pulse_width_for_angle(-30f64.to_radians()), 1166);
    }

    #[test]
    fn test_asymmetric_calibration() {
        let mut s = servo(false);
        s.calibration = Calibration {
            centre_rad: 0.1,
            low_rad: -1.1,
            high_rad: 1.6,
        };

        assert_eq!(s.pulse_width_for_angle(0.1), 1500);
        assert_eq!(s.pulse_width_for_angle(-0.4), 1083);
        assert_eq!(s.pulse_width_for_angle(0.6), 1833);
        assert!((s.angle_for_pulse_width(500) + 1.1).abs() < 1e-12);
        assert!((s.angle_for_pulse_width(2500) - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_round_trip() {
        let s = servo(false);

        for pulse_us in (500..=2500).step_by(7) {
            let back = s.pulse_width_for_angle(s.angle_for_pulse_width(pulse_us));
            assert!(
                (back - pulse_us).abs() <= 1,
                "{} us came back as {} us",
                pulse_us,
                back
            );
        }
    }

    #[test]
    fn test_rate_and_limits() {
        let s = servo(false);
        assert!((s.rotate_rate_degs() - 60.0 / 0.23).abs() < 1e-12);

        let (a, limited) = s.clamp_joint_deg(90.0);
        assert!(limited);
        assert!((a - 1.2f64.to_degrees()).abs() < 1e-12);
        assert!(s.in_limits_deg(-50.0));
        assert!(!s.in_limits_deg(-60.0));
    }

    #[test]
    fn test_inverted_command() {
        let cmd = servo(false).command_for_joint_deg(30.0);
        assert_eq!(cmd, ServoCommand::new(2, 1833));

        let cmd = servo(true).command_for_joint_deg(30.0);
        assert_eq!(cmd, ServoCommand::new(2, 1166));
    }

    #[test]
    fn test_validate() {
        assert_eq!(servo(false).validate(), Ok(()));

        let mut s = servo(false);
        s.calibration.low_rad = 0.5;
        assert_eq!(
            s.validate(),
            Err(ServoError::InvalidCalibration(String::from("elbow")))
        );

        let mut s = servo(false);
        s.speed_s_per_60_deg = 0.0;
        assert_eq!(s.validate(), Err(ServoError::InvalidSpeed(String::from("elbow"))));
    }
}
