//! # Telecommand module
//!
//! Telecommands are the discrete instructions given to the arm executable,
//! either from a script or from the command line. Each one is consumed by the
//! control loop exactly once.
//!
//! Telecommands are carried as JSON with the variant in `type` and its data
//! in `payload`:
//!
//! ```text
//! {"type": "ArmCtrl", "payload": {"MoveTo": {"x_m": 0.2, "y_m": 0.0, "z_m": 0.1}}}
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod arm_ctrl;
pub mod bus;
pub mod gripper;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use thiserror::Error;

// Internal
use arm_ctrl::ArmCmd;
use bus::BusCmd;
use gripper::GripperCmd;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Tc {
    /// Keep-alive, does nothing
    Heartbeat,

    /// Put the arm into safe mode, stopping all motion
    MakeSafe,

    /// Leave safe mode
    MakeUnsafe,

    /// Command for arm control
    ArmCtrl(ArmCmd),

    /// Command for the gripper
    Gripper(GripperCmd),

    /// Command for the servo bus connection
    Bus(BusCmd),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }

    /// Returns true if the TC may be executed while in safe mode.
    pub fn allowed_in_safe_mode(&self) -> bool {
        matches!(
            self,
            Tc::Heartbeat | Tc::MakeSafe | Tc::MakeUnsafe | Tc::Bus(_)
        )
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::serial::BaudRate;

    #[test]
    fn test_parse_tcs() {
        assert_eq!(Tc::from_json(r#"{"type": "MakeSafe"}"#).unwrap(), Tc::MakeSafe);

        assert_eq!(
            Tc::from_json(
                r#"{"type": "ArmCtrl", "payload": {"MoveTo": {"x_m": 0.2, "y_m": 0.0, "z_m": 0.1}}}"#
            )
            .unwrap(),
            Tc::ArmCtrl(ArmCmd::MoveTo {
                x_m: 0.2,
                y_m: 0.0,
                z_m: 0.1
            })
        );

        assert_eq!(
            Tc::from_json(r#"{"type": "Gripper", "payload": "Close"}"#).unwrap(),
            Tc::Gripper(GripperCmd::Close)
        );

        assert_eq!(
            Tc::from_json(r#"{"type": "Bus", "payload": {"SetBaud": {"baud": "B38400"}}}"#)
                .unwrap(),
            Tc::Bus(BusCmd::SetBaud {
                baud: BaudRate::B38400
            })
        );

        assert!(Tc::from_json(r#"{"type": "Dance"}"#).is_err());
        assert!(Tc::from_json("not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let tc = Tc::ArmCtrl(ArmCmd::SetJoint {
            joint: arm_ctrl::JointId::Elbow,
            angle_deg: -12.5,
        });

        assert_eq!(Tc::from_json(&tc.to_json().unwrap()).unwrap(), tc);
    }
}
