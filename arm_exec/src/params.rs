//! # Arm Executable Parameters
//!
//! This module provide parameters for the arm executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bus_client::BusConfig;
use comms_if::serial::BaudRate;
use util::time::millis;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmExecParams {
    /// Index of the serial device to open at startup in the enumerated device
    /// list. A negative index starts with no device selected.
    pub serial_device_index: i64,

    /// Initial line rate of the serial device
    pub baud: BaudRate,

    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Minimum time between single servo commands on one channel.
    ///
    /// Units: milliseconds
    pub throttle_period_ms: u64,

    /// How often throttled commands are checked for release.
    ///
    /// Units: milliseconds
    pub flush_period_ms: u64,

    /// Time between gripper pressure requests.
    ///
    /// Units: milliseconds
    pub pressure_poll_period_ms: u64,

    /// Longest wait for a pressure reply.
    ///
    /// Units: milliseconds
    pub read_timeout_ms: u64,

    /// Analog input the pressure sensor is wired to, `A` to `H`
    pub pressure_channel: char,
}

#[derive(Debug, Error)]
pub enum ArmExecParamsError {
    #[error("Cycle period must be positive, found {0} s")]
    InvalidCyclePeriod(f64),

    #[error("Bus periods must be non-zero")]
    ZeroBusPeriod,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmExecParams {
    pub fn are_valid(&self) -> Result<(), ArmExecParamsError> {
        if !(self.cycle_period_s > 0.0) {
            return Err(ArmExecParamsError::InvalidCyclePeriod(self.cycle_period_s));
        }

        if self.throttle_period_ms == 0
            || self.flush_period_ms == 0
            || self.pressure_poll_period_ms == 0
        {
            return Err(ArmExecParamsError::ZeroBusPeriod);
        }

        Ok(())
    }

    /// Bus configuration described by these parameters.
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            baud: self.baud,
            throttle_period: millis(self.throttle_period_ms),
            flush_period: millis(self.flush_period_ms),
            poll_period: millis(self.pressure_poll_period_ms),
            read_timeout: millis(self.read_timeout_ms),
            pressure_channel: self.pressure_channel,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_params_file() {
        let params: ArmExecParams =
            util::params::from_str(include_str!("../../params/arm_exec.toml")).unwrap();
        params.are_valid().unwrap();

        let bus = params.bus_config();
        assert_eq!(bus.throttle_period, Duration::from_millis(90));
        assert_eq!(bus.poll_period, Duration::from_millis(100));
        assert_eq!(bus.pressure_channel, 'H');
    }
}
