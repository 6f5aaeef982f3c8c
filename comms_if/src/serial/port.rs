//! [`SerialTransport`] backed by an OS serial device.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};
use serialport::SerialPort;
use std::{
    io::{self, Read, Write},
    time::{Duration, Instant},
};

use super::{BaudRate, DeviceEnumerator, SerialTransport, TransportError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Timeout applied to writes and to reads with no explicit timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Transport over a serial device opened with the `serialport` crate.
#[derive(Default)]
pub struct SerialPortTransport {
    port: Option<Box<dyn SerialPort>>,
    path: Option<String>,
}

/// Lists the serial devices present on this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnumerator;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SerialPortTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SerialTransport for SerialPortTransport {
    fn open(&mut self, path: &str, baud: BaudRate) -> Result<(), TransportError> {
        self.close();

        let port = serialport::new(path, baud.bits_per_second())
            .timeout(DEFAULT_TIMEOUT)
            .open()
            .map_err(|e| TransportError::OpenFailed(path.to_string(), e.to_string()))?;

        info!("Opened serial device {} at {} baud", path, baud);

        self.port = Some(port);
        self.path = Some(path.to_string());

        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotOpen)?;

        port.write_all(data)?;
        port.flush()?;

        Ok(())
    }

    fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotOpen)?;

        port.set_timeout(timeout).map_err(io::Error::from)?;

        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; len];
        let mut got = 0;

        while got < len {
            match port.read(&mut buf[got..]) {
                Ok(n) => got += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => (),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => return Err(e.into()),
            }

            if got < len && Instant::now() >= deadline {
                return Err(TransportError::Timeout { expected: len, got });
            }
        }

        Ok(buf)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed serial device {:?}", self.path.take());
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl DeviceEnumerator for SystemEnumerator {
    fn list_devices(&self) -> Result<Vec<String>, TransportError> {
        let ports = serialport::available_ports()
            .map_err(|e| TransportError::EnumerateFailed(e.to_string()))?;

        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}
