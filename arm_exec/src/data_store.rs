//! # Data Store

use comms_if::{
    serial::PortSelection,
    tc::{arm_ctrl::ArmCmd, gripper::GripperCmd},
};
use log::{debug, error, info, warn};

use crate::{arm_ctrl, bus_client::BusEvent};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Limit of the number of consecutive bus write failures before safe mode
/// will be engaged.
pub const MAX_BUS_ERROR_LIMIT: u64 = 5;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the arm has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    MakeSafeTc,
    BusNotConnected,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time at the start of this cycle
    pub time_s: f64,

    /// Time since the start of the previous cycle
    pub elapsed_s: f64,

    // Safe mode variables
    /// Determines if the arm is in safe mode.
    pub safe: bool,

    /// Gives the reason for the arm being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // Servo bus
    /// Known serial devices and the selected one
    pub ports: PortSelection,

    /// Latest pressure reading received this cycle
    pub pressure: Option<f64>,

    // ArmCtrl
    pub arm_ctrl: arm_ctrl::ArmCtrl,
    pub arm_cmd: Option<ArmCmd>,
    pub gripper_cmd: Option<GripperCmd>,
    pub arm_ctrl_output: arm_ctrl::OutputData,
    pub arm_ctrl_status_rpt: arm_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive bus write failures
    pub num_consec_bus_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Puts the arm into safe mode with the given cause.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            self.arm_ctrl.make_safe();
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns `Ok(())` if this cause was cleared and safe mode was disabled, or `Err(())`
    /// otherwise. To remove safe mode the provided cause must match the initial reason for safe
    /// mode being enabled.
    ///
    /// If safe mode was not enabled `Ok(())` is returned
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), ()> {
        if !self.safe {
            return Ok(());
        }

        match self.safe_cause {
            Some(root_cause) => {
                if cause == root_cause {
                    self.safe = false;
                    self.safe_cause = None;
                    info!("Make unsafe requested, root cause match, safe mode disabled");
                    Ok(())
                } else {
                    Err(())
                }
            }
            None => Ok(()),
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz.max(1.0) as u128) == 0;

        self.arm_cmd = None;
        self.gripper_cmd = None;
        self.pressure = None;
        self.arm_ctrl_output = arm_ctrl::OutputData::default();
        self.arm_ctrl_status_rpt = arm_ctrl::StatusReport::default();

        let now_s = util::session::get_elapsed_seconds();
        self.elapsed_s = if self.num_cycles == 0 {
            0.0
        } else {
            now_s - self.time_s
        };
        self.time_s = now_s;
    }

    /// Update the store from a bus event.
    ///
    /// Isolated read or write failures are tolerated, safe mode is only
    /// entered when the device can't be opened or when more than
    /// [`MAX_BUS_ERROR_LIMIT`] writes fail in a row.
    pub fn handle_bus_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::Pressure(p) => self.pressure = Some(p),
            BusEvent::PortOpened(_) => {
                self.num_consec_bus_errors = 0;
                self.make_unsafe(SafeModeCause::BusNotConnected).ok();
            }
            BusEvent::OpenFailed(e) => {
                error!("Servo bus not connected: {}", e);
                self.make_safe(SafeModeCause::BusNotConnected);
            }
            BusEvent::WriteFailed { consecutive, .. } => {
                self.num_consec_bus_errors = consecutive;

                // If over the limit print error and enter safe mode
                if self.num_consec_bus_errors > MAX_BUS_ERROR_LIMIT {
                    if !self.safe {
                        error!(
                            "Maximum number of consecutive bus errors ({}) has been exceeded",
                            MAX_BUS_ERROR_LIMIT
                        );
                    }
                    self.make_safe(SafeModeCause::BusNotConnected);
                }
            }
            BusEvent::ReadFailed(e) => debug!("Pressure read failed: {}", e),
        }
    }

    /// Input data for this cycle's arm control processing.
    pub fn arm_ctrl_input(&self) -> arm_ctrl::InputData {
        arm_ctrl::InputData {
            cmd: self.arm_cmd.clone(),
            gripper_cmd: self.gripper_cmd.clone(),
            elapsed_s: self.elapsed_s,
            time_s: self.time_s,
            pressure: self.pressure,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
