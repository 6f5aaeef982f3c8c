//! # Servo bus telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;

use crate::serial::BaudRate;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command changing the connection to the servo controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
pub enum BusCmd {
    /// Select the serial device at an index of the enumerated device list.
    ///
    /// An index outside the list closes the connection and clears the
    /// selection.
    #[structopt(name = "port")]
    SelectPort {
        #[structopt(allow_hyphen_values = true)]
        index: i64,
    },

    /// Change the baud rate, reopening the selected device.
    #[structopt(name = "baud")]
    SetBaud { baud: BaudRate },
}
