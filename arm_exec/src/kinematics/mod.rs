//! # Kinematics module
//!
//! Denavit-Hartenberg description of the arm, forward kinematics with the
//! ground collision check, and a numeric inverse kinematics solver.
//!
//! Joint vectors are ordered as the variable stages of the chain appear.
//! Angular entries may be given in degrees or radians, see [`JointUnits`].
//! Linear entries (for `R` and `D` stages) are always in meters.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chain;
mod dh;
mod inverse;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use chain::*;
pub use dh::*;
pub use inverse::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// End effector heights below this are treated as touching the ground.
///
/// Units: meters
pub const GROUND_COLLISION_HEIGHT_M: f64 = 0.01;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Units of the angular entries of a joint vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointUnits {
    Radians,
    Degrees,
}

/// Errors raised by the kinematics.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum KinematicsError {
    #[error("Expected at least {expected} joint values, found {found}")]
    NotEnoughJoints { expected: usize, found: usize },

    #[error("The chain has no variable stages to solve for")]
    NoVariableStages,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointUnits {
    /// Convert an angle in these units into radians.
    pub fn to_radians(&self, value: f64) -> f64 {
        match self {
            JointUnits::Radians => value,
            JointUnits::Degrees => value.to_radians(),
        }
    }

    /// Convert an angle in radians into these units.
    pub fn from_radians(&self, value_rad: f64) -> f64 {
        match self {
            JointUnits::Radians => value_rad,
            JointUnits::Degrees => value_rad.to_degrees(),
        }
    }
}

// ---------------------------------------------------------------------------
// TEST HELPERS
// ---------------------------------------------------------------------------

/// Four revolute joint chain with the proportions of a small desktop arm:
/// base swivel, shoulder, elbow and wrist.
///
/// With all joints at zero the upper arm is vertical and the forearm and
/// tool point along X.
#[cfg(test)]
pub(crate) fn test_arm_chain() -> KinematicChain {
    KinematicChain::new(vec![
        TransformStage::from_degrees(VariableParameter::Theta, 0.0, 90.0, 0.0, 0.0738),
        TransformStage::from_degrees(VariableParameter::Theta, 90.0, 0.0, 0.146, 0.0),
        TransformStage::from_degrees(VariableParameter::Theta, -90.0, 0.0, 0.185, 0.0),
        TransformStage::from_degrees(VariableParameter::Theta, 0.0, 0.0, 0.0932, 0.0),
    ])
}
