//! Parameters structure for ArmCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::servo::{JointActuator, ServoError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Arm control.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Params {
    /// Which build of the arm is attached
    pub arm_variant: ArmVariant,

    /// Units used for the end effector position in telemetry
    pub telemetry_units: TelemetryUnits,

    // ---- GEOMETRY ----
    pub geometry: Geometry,

    // ---- ACTUATORS ----
    /// Servo definitions in joint order: base, shoulder, elbow, wrist,
    /// gripper and, for the wrist rotate variant, wrist rotate.
    pub servos: Vec<JointActuator>,

    // ---- MOTION ----
    /// End effector speed used to time cartesian moves.
    ///
    /// Units: meters/second
    pub travel_speed_ms: f64,

    /// Grip pressure limit used by grip commands without an explicit limit.
    pub grip_limit_pressure: f64,
}

/// Link lengths of the arm.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Geometry {
    /// Height of the shoulder pivot above the mounting surface.
    ///
    /// Units: meters
    pub shoulder_height_m: f64,

    /// Shoulder pivot to elbow pivot.
    ///
    /// Units: meters
    pub upper_arm_m: f64,

    /// Elbow pivot to wrist pivot.
    ///
    /// Units: meters
    pub forearm_m: f64,

    /// Wrist pivot to the gripper fingers when no wrist rotate is fitted.
    ///
    /// Units: meters
    pub wrist_to_gripper_m: f64,

    /// Extra length added by the wrist rotate assembly.
    ///
    /// Units: meters
    pub wrist_rotate_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Supported builds of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmVariant {
    /// Base, shoulder, elbow, wrist and gripper
    Standard,

    /// As standard with a wrist rotate joint between the wrist and gripper
    WristRotate,
}

/// Length units for end effector telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryUnits {
    Meters,
    Centimeters,
    Millimeters,
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("The {variant:?} arm needs {expected} servos but {found} are defined")]
    WrongNumServos {
        variant: ArmVariant,
        expected: usize,
        found: usize,
    },

    #[error("Not all servos have a unique channel")]
    NonUniqueChannels,

    #[error("Invalid servo: {0}")]
    InvalidServo(#[from] ServoError),

    #[error("Geometry lengths must be positive")]
    InvalidGeometry,

    #[error("Travel speed must be positive")]
    InvalidTravelSpeed,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ArmVariant {
    fn default() -> Self {
        ArmVariant::Standard
    }
}

impl Default for TelemetryUnits {
    fn default() -> Self {
        TelemetryUnits::Meters
    }
}

impl ArmVariant {
    /// Number of servo driven joints, including the gripper.
    pub fn num_joints(&self) -> usize {
        match self {
            ArmVariant::Standard => 5,
            ArmVariant::WristRotate => 6,
        }
    }
}

impl TelemetryUnits {
    /// Multiplier from meters into these units.
    pub fn multiplier(&self) -> f64 {
        match self {
            TelemetryUnits::Meters => 1.0,
            TelemetryUnits::Centimeters => 100.0,
            TelemetryUnits::Millimeters => 1000.0,
        }
    }
}

impl Params {
    /// Determines if the parameters are valid.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        let expected = self.arm_variant.num_joints();
        if self.servos.len() != expected {
            return Err(ParamsError::WrongNumServos {
                variant: self.arm_variant,
                expected,
                found: self.servos.len(),
            });
        }

        for servo in self.servos.iter() {
            servo.validate()?;
        }

        for (i, servo) in self.servos.iter().enumerate() {
            if self.servos[i + 1..]
                .iter()
                .any(|s| s.channel == servo.channel)
            {
                return Err(ParamsError::NonUniqueChannels);
            }
        }

        let g = &self.geometry;
        if [
            g.shoulder_height_m,
            g.upper_arm_m,
            g.forearm_m,
            g.wrist_to_gripper_m,
            g.wrist_rotate_m,
        ]
        .iter()
        .any(|l| !(*l > 0.0))
        {
            return Err(ParamsError::InvalidGeometry);
        }

        if !(self.travel_speed_ms > 0.0) {
            return Err(ParamsError::InvalidTravelSpeed);
        }

        Ok(())
    }
}
