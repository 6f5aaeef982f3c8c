//! # Arm control module
//!
//! Arm control turns arm and gripper commands into servo demands. It owns the
//! kinematic model of the arm, the motion interpolator tracking where each
//! joint physically is, and the gripper controller.
//!
//! Joint vectors are always in degrees and in servo channel order: base,
//! shoulder, elbow, wrist, gripper and, if fitted, wrist rotate.
//!
//! Two kinds of demand are produced:
//!
//! - Single joint demands, produced whenever a joint target changes. These
//!   are rate limited per channel by the bus client.
//! - Move frames, moving several servos together, used by cartesian moves,
//!   centring and stopping.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod arm_config;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use arm_config::*;
pub use params::*;
pub use state::*;

use comms_if::tc::arm_ctrl::JointId;
use util::{archive::ArchiveError, params::LoadError};

use crate::kinematics::KinematicsError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The largest number of joints on any arm variant.
pub const MAX_NUM_JOINTS: usize = 6;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ArmCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ArmCtrlError {
    #[error("ArmCtrl has not been initialised")]
    NotInitialised,

    #[error("Could not load the ArmCtrl parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Invalid ArmCtrl parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Could not open the ArmCtrl archive: {0}")]
    ArchiveError(#[from] ArchiveError),

    #[error("The {0} joint is not fitted to this arm")]
    JointNotFitted(JointId),

    #[error("Kinematics error: {0}")]
    KinematicsError(#[from] KinematicsError),
}
