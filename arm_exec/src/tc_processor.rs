//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};

// Internal
use crate::{
    bus_client::{BusClient, BusClientError},
    data_store::{DataStore, SafeModeCause},
};
use comms_if::tc::{bus::BusCmd, Tc};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules. Bus commands
/// are passed straight to the bus client if there is one.
pub fn exec(ds: &mut DataStore, bus: Option<&BusClient>, tc: &Tc) -> Result<(), BusClientError> {
    if ds.safe && !tc.allowed_in_safe_mode() {
        warn!("In safe mode, {:?} rejected", tc);
        return Ok(());
    }

    // Handle different Tcs
    match tc {
        Tc::Heartbeat => (),
        Tc::MakeSafe => {
            debug!("Recieved MakeSafe command");
            ds.make_safe(SafeModeCause::MakeSafeTc);
        }
        Tc::MakeUnsafe => {
            debug!("Recieved MakeUnsafe command");
            ds.make_unsafe(SafeModeCause::MakeSafeTc).ok();
        }
        Tc::ArmCtrl(cmd) => ds.arm_cmd = Some(cmd.clone()),
        Tc::Gripper(cmd) => ds.gripper_cmd = Some(cmd.clone()),
        Tc::Bus(BusCmd::SelectPort { index }) => {
            let port = ds.ports.select(*index).map(String::from);

            match port {
                Some(ref p) => info!("Selected serial device {}", p),
                None => info!("Serial device selection cleared"),
            }

            if let Some(b) = bus {
                b.select_port(port)?;
            }
        }
        Tc::Bus(BusCmd::SetBaud { baud }) => {
            if let Some(b) = bus {
                b.set_baud(*baud)?;
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{
        serial::PortSelection,
        tc::{arm_ctrl::ArmCmd, gripper::GripperCmd},
    };

    #[test]
    fn test_dispatch() {
        let mut ds = DataStore::default();

        exec(&mut ds, None, &Tc::ArmCtrl(ArmCmd::CentreAll)).unwrap();
        exec(&mut ds, None, &Tc::Gripper(GripperCmd::Close)).unwrap();
        assert_eq!(ds.arm_cmd, Some(ArmCmd::CentreAll));
        assert_eq!(ds.gripper_cmd, Some(GripperCmd::Close));
    }

    #[test]
    fn test_safe_mode_rejects_motion() {
        let mut ds = DataStore::default();
        ds.ports = PortSelection::new(vec!["/dev/ttyUSB0".into()]);

        exec(&mut ds, None, &Tc::MakeSafe).unwrap();
        assert!(ds.safe);

        exec(&mut ds, None, &Tc::ArmCtrl(ArmCmd::Stop)).unwrap();
        assert_eq!(ds.arm_cmd, None);

        // Port selection is still allowed
        exec(&mut ds, None, &Tc::Bus(BusCmd::SelectPort { index: 0 })).unwrap();
        assert_eq!(ds.ports.selected_path(), Some("/dev/ttyUSB0"));
        exec(&mut ds, None, &Tc::Bus(BusCmd::SelectPort { index: 4 })).unwrap();
        assert_eq!(ds.ports.selected_path(), None);

        exec(&mut ds, None, &Tc::MakeUnsafe).unwrap();
        assert!(!ds.safe);
    }
}
