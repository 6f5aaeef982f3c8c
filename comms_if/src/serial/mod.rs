//! # Serial transport
//!
//! The servo controller board is reached through a byte stream, normally a
//! USB serial adapter. Everything above this module talks to the board
//! through the [`SerialTransport`] trait so that the control software can be
//! run against [`MockTransport`] when no hardware is attached.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod mock;
mod port;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

pub use mock::{MockEnumerator, MockTransport, MockTransportHandle};
pub use port::{SerialPortTransport, SystemEnumerator};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A byte stream connection to the servo controller.
pub trait SerialTransport: Send {
    /// Open the device at `path`, closing any previously open device first.
    fn open(&mut self, path: &str, baud: BaudRate) -> Result<(), TransportError>;

    /// Write all bytes to the device.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read exactly `len` bytes, failing if they do not all arrive within
    /// `timeout`.
    fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Close the device. Closing an already closed transport does nothing.
    fn close(&mut self);

    /// Returns true if a device is currently open.
    fn is_open(&self) -> bool;
}

/// Lists the device paths a transport could be opened on.
pub trait DeviceEnumerator {
    fn list_devices(&self) -> Result<Vec<String>, TransportError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The list of known devices and which one, if any, is selected.
#[derive(Debug, Clone, Default)]
pub struct PortSelection {
    devices: Vec<String>,
    selected: Option<usize>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No serial device is open")]
    NotOpen,

    #[error("Could not open serial device {0}: {1}")]
    OpenFailed(String, String),

    #[error("Could not list serial devices: {0}")]
    EnumerateFailed(String),

    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Read timed out after {got} of {expected} bytes")]
    Timeout { expected: usize, got: usize },
}

/// Baud rates supported by the servo controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaudRate {
    B9600,
    B38400,
    B115200,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BaudRate {
    /// All rates in selection order.
    pub const ALL: [BaudRate; 3] = [BaudRate::B9600, BaudRate::B38400, BaudRate::B115200];

    /// Get the rate at a selection index, or `None` if the index is unknown.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Line rate in bits per second.
    pub fn bits_per_second(&self) -> u32 {
        match self {
            BaudRate::B9600 => 9600,
            BaudRate::B38400 => 38400,
            BaudRate::B115200 => 115200,
        }
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate::B9600
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

impl FromStr for BaudRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "9600" => Ok(BaudRate::B9600),
            "38400" => Ok(BaudRate::B38400),
            "115200" => Ok(BaudRate::B115200),
            other => Err(format!(
                "Unsupported baud rate {}, expected one of 9600, 38400 or 115200",
                other
            )),
        }
    }
}

impl PortSelection {
    /// Create a selection over the given devices with nothing selected.
    pub fn new(devices: Vec<String>) -> Self {
        Self {
            devices,
            selected: None,
        }
    }

    /// Build a selection from the devices currently present.
    pub fn enumerate(enumerator: &dyn DeviceEnumerator) -> Result<Self, TransportError> {
        Ok(Self::new(enumerator.list_devices()?))
    }

    /// Select the device at `index`.
    ///
    /// An index outside the device list clears the selection. Returns the
    /// path of the newly selected device.
    pub fn select(&mut self, index: i64) -> Option<&str> {
        self.selected = if index >= 0 && (index as usize) < self.devices.len() {
            Some(index as usize)
        } else {
            None
        };

        self.selected_path()
    }

    /// Path of the selected device.
    pub fn selected_path(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.devices.get(i))
            .map(|s| s.as_str())
    }

    /// Full paths of all known devices.
    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    /// Short names for each device, suitable for showing to an operator.
    pub fn display_names(&self) -> Vec<String> {
        if self.devices.is_empty() {
            return vec![String::from("None Found")];
        }

        self.devices.iter().map(|d| short_name(d)).collect()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Strip a device path down to the part after the last `.` or, failing that,
/// the last `/`.
fn short_name(path: &str) -> String {
    if let Some(i) = path.rfind('.') {
        return path[i + 1..].to_string();
    }
    if let Some(i) = path.rfind('/') {
        return path[i + 1..].to_string();
    }
    path.to_string()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_port_selection() {
        let enumerator = MockEnumerator::new(vec![
            "/dev/cu.usbserial-A1".to_string(),
            "/dev/ttyUSB0".to_string(),
        ]);
        let mut sel = PortSelection::enumerate(&enumerator).unwrap();

        assert_eq!(sel.selected_path(), None);
        assert_eq!(sel.select(1), Some("/dev/ttyUSB0"));
        assert_eq!(sel.select(0), Some("/dev/cu.usbserial-A1"));

        // Out of range clears
        assert_eq!(sel.select(2), None);
        assert_eq!(sel.selected_path(), None);
        sel.select(1);
        assert_eq!(sel.select(-1), None);

        assert_eq!(
            sel.display_names(),
            vec!["usbserial-A1".to_string(), "ttyUSB0".to_string()]
        );
        assert_eq!(
            PortSelection::new(vec![]).display_names(),
            vec!["None Found".to_string()]
        );
    }

    #[test]
    fn test_baud_rate() {
        assert_eq!(BaudRate::from_index(1), Some(BaudRate::B38400));
        assert_eq!(BaudRate::from_index(3), None);
        assert_eq!("115200".parse::<BaudRate>(), Ok(BaudRate::B115200));
        assert!("57600".parse::<BaudRate>().is_err());
        assert_eq!(BaudRate::default().bits_per_second(), 9600);
    }
}
