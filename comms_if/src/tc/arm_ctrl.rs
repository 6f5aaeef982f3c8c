//! # Arm control telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command that can be completed by arm control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
pub enum ArmCmd {
    /// Move a single joint to an angle.
    #[structopt(name = "joint")]
    SetJoint {
        /// The joint to move (base, shoulder, elbow, wrist, gripper,
        /// wrist_rotate)
        joint: JointId,

        /// Target angle in degrees.
        #[structopt(allow_hyphen_values = true)]
        angle_deg: f64,
    },

    /// Set the target angle of every joint at once, in joint order.
    ///
    /// Missing trailing joints keep their current target.
    #[structopt(name = "joints")]
    SetJoints {
        /// Target angles in degrees
        #[structopt(allow_hyphen_values = true)]
        angles_deg: Vec<f64>,
    },

    /// Move the end effector to a cartesian position.
    ///
    /// The joint angles are found with inverse kinematics. If no solution
    /// exists the arm does not move.
    #[structopt(name = "goto")]
    MoveTo {
        /// Distance in front of the base.
        ///
        /// Units: meters
        #[structopt(allow_hyphen_values = true)]
        x_m: f64,

        /// Distance to the left of the base.
        ///
        /// Units: meters
        #[structopt(allow_hyphen_values = true)]
        y_m: f64,

        /// Height above the base.
        ///
        /// Units: meters
        #[structopt(allow_hyphen_values = true)]
        z_m: f64,
    },

    /// Check whether a cartesian position can be reached, without moving.
    #[structopt(name = "check")]
    CheckPosition {
        #[structopt(allow_hyphen_values = true)]
        x_m: f64,
        #[structopt(allow_hyphen_values = true)]
        y_m: f64,
        #[structopt(allow_hyphen_values = true)]
        z_m: f64,
    },

    /// Command every servo to its centre position.
    #[structopt(name = "centre")]
    CentreAll,

    /// Stop the arm where it currently is.
    #[structopt(name = "stop")]
    Stop,
}

/// The joints of the arm, in servo channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointId {
    Base,
    Shoulder,
    Elbow,
    Wrist,
    Gripper,
    WristRotate,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JointId {
    /// All joints in order.
    pub const ALL: [JointId; 6] = [
        JointId::Base,
        JointId::Shoulder,
        JointId::Elbow,
        JointId::Wrist,
        JointId::Gripper,
        JointId::WristRotate,
    ];

    /// Position of the joint in a joint vector.
    pub fn index(&self) -> usize {
        match self {
            JointId::Base => 0,
            JointId::Shoulder => 1,
            JointId::Elbow => 2,
            JointId::Wrist => 3,
            JointId::Gripper => 4,
            JointId::WristRotate => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JointId::Base => "base",
            JointId::Shoulder => "shoulder",
            JointId::Elbow => "elbow",
            JointId::Wrist => "wrist",
            JointId::Gripper => "gripper",
            JointId::WristRotate => "wrist_rotate",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for JointId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        JointId::ALL
            .iter()
            .find(|j| j.to_string() == lower)
            .copied()
            .ok_or_else(|| format!("Unknown joint \"{}\"", s))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_joint_ids() {
        for (i, j) in JointId::ALL.iter().enumerate() {
            assert_eq!(j.index(), i);
            assert_eq!(JointId::from_index(i), Some(*j));
            assert_eq!(j.to_string().parse::<JointId>(), Ok(*j));
        }
        assert_eq!("Wrist_Rotate".parse::<JointId>(), Ok(JointId::WristRotate));
        assert!("tail".parse::<JointId>().is_err());
    }

    #[test]
    fn test_cli_parse() {
        let cmd = ArmCmd::from_iter_safe(&["arm", "joint", "elbow", "30"]).unwrap();
        assert_eq!(
            cmd,
            ArmCmd::SetJoint {
                joint: JointId::Elbow,
                angle_deg: 30.0
            }
        );

        let cmd = ArmCmd::from_iter_safe(&["arm", "goto", "0.2", "0", "0.1"]).unwrap();
        assert_eq!(
            cmd,
            ArmCmd::MoveTo {
                x_m: 0.2,
                y_m: 0.0,
                z_m: 0.1
            }
        );
    }
}
