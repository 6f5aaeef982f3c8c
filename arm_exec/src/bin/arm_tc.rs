//! # Telecommand builder
//!
//! Builds a single telecommand from the command line and prints it as a JSON
//! line, in the form read by `arm_exec` on stdin:
//!
//! ```text
//! arm_tc arm goto 0.2 0 0.1 | arm_exec
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use structopt::StructOpt;

// Internal
use comms_if::tc::{arm_ctrl::ArmCmd, bus::BusCmd, gripper::GripperCmd, Tc};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Build a telecommand for the servo arm executable
#[derive(Debug, StructOpt)]
#[structopt(name = "arm_tc")]
enum TcArgs {
    /// Keep-alive, does nothing
    #[structopt(name = "heartbeat")]
    Heartbeat,

    /// Put the arm into safe mode
    #[structopt(name = "safe")]
    MakeSafe,

    /// Leave safe mode
    #[structopt(name = "unsafe")]
    MakeUnsafe,

    /// Arm control command
    #[structopt(name = "arm")]
    Arm {
        #[structopt(subcommand)]
        cmd: ArmCmd,
    },

    /// Gripper command
    #[structopt(name = "gripper")]
    Gripper {
        #[structopt(subcommand)]
        cmd: GripperCmd,
    },

    /// Servo bus command
    #[structopt(name = "bus")]
    Bus {
        #[structopt(subcommand)]
        cmd: BusCmd,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<TcArgs> for Tc {
    fn from(args: TcArgs) -> Self {
        match args {
            TcArgs::Heartbeat => Tc::Heartbeat,
            TcArgs::MakeSafe => Tc::MakeSafe,
            TcArgs::MakeUnsafe => Tc::MakeUnsafe,
            TcArgs::Arm { cmd } => Tc::ArmCtrl(cmd),
            TcArgs::Gripper { cmd } => Tc::Gripper(cmd),
            TcArgs::Bus { cmd } => Tc::Bus(cmd),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let tc = Tc::from(TcArgs::from_args());

    println!("{}", tc.to_json().wrap_err("Could not serialise the TC")?);

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{serial::BaudRate, tc::arm_ctrl::JointId};

    fn parse(args: &[&str]) -> Tc {
        Tc::from(TcArgs::from_iter_safe(args).unwrap())
    }

    #[test]
    fn test_parse_tcs() {
        assert_eq!(parse(&["arm_tc", "safe"]), Tc::MakeSafe);

        assert_eq!(
            parse(&["arm_tc", "arm", "joint", "shoulder", "20"]),
            Tc::ArmCtrl(ArmCmd::SetJoint {
                joint: JointId::Shoulder,
                angle_deg: 20.0
            })
        );

        assert_eq!(
            parse(&["arm_tc", "gripper", "grip", "100"]),
            Tc::Gripper(GripperCmd::GripToLimit {
                pressure: Some(100.0)
            })
        );
        assert_eq!(
            parse(&["arm_tc", "gripper", "close"]),
            Tc::Gripper(GripperCmd::Close)
        );

        assert_eq!(
            parse(&["arm_tc", "bus", "baud", "115200"]),
            Tc::Bus(BusCmd::SetBaud {
                baud: BaudRate::B115200
            })
        );
        assert_eq!(
            parse(&["arm_tc", "bus", "port", "1"]),
            Tc::Bus(BusCmd::SelectPort { index: 1 })
        );

        assert!(TcArgs::from_iter_safe(&["arm_tc", "arm", "joint", "tail", "20"]).is_err());
    }

    #[test]
    fn test_output_is_readable_tc() {
        let tc = parse(&["arm_tc", "arm", "goto", "0.2", "0", "0.1"]);
        let json = tc.to_json().unwrap();

        assert!(!json.contains('\n'));
        assert_eq!(Tc::from_json(&json).unwrap(), tc);
    }
}
