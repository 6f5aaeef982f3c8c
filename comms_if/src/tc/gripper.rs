//! # Gripper telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command for the gripper.
///
/// Distances are the separation between the fingers, from `0.0` (closed) to
/// the gripper's full range, in meters. Pressures are raw sensor readings
/// between 0 and 255.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
pub enum GripperCmd {
    /// Close the gripper fully at full speed.
    #[structopt(name = "close")]
    Close,

    /// Open the gripper fully at full speed.
    #[structopt(name = "open")]
    Open,

    /// Close slowly until the pressure sensor reaches a limit.
    ///
    /// Without a pressure the configured grip limit is used.
    #[structopt(name = "grip")]
    GripToLimit { pressure: Option<f64> },

    /// Release a grip, opening fully.
    #[structopt(name = "release")]
    Release,

    /// Close to a finger separation.
    #[structopt(name = "close-to")]
    CloseToDistance { distance_m: f64 },

    /// Close slowly until either the separation or the pressure is reached.
    #[structopt(name = "close-to-or-grip")]
    CloseToDistanceOrPressure { distance_m: f64, pressure: f64 },

    /// Open to a finger separation.
    #[structopt(name = "open-to")]
    OpenToDistance { distance_m: f64 },

    /// Change the configured grip limit.
    #[structopt(name = "limit")]
    SetLimit { pressure: f64 },
}
