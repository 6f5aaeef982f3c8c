//! In-memory transport used when no hardware is attached and in tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use super::{BaudRate, DeviceEnumerator, SerialTransport, TransportError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A transport which records every write and answers reads from a queue of
/// scripted replies.
///
/// Cloning the [`MockTransportHandle`] returned by [`MockTransport::new`]
/// gives access to the same state after the transport has been moved into
/// the bus worker.
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Shared view of a [`MockTransport`]'s state.
#[derive(Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockState>>,
}

/// Enumerator returning a fixed list of devices.
#[derive(Debug, Clone, Default)]
pub struct MockEnumerator {
    devices: Vec<String>,
}

#[derive(Default)]
struct MockState {
    opened: Option<(String, BaudRate)>,
    num_opens: usize,
    written: Vec<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
    fail_writes: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MockTransport {
    /// Create a closed mock transport and a handle onto its state.
    pub fn new() -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));

        (
            Self {
                state: state.clone(),
            },
            MockTransportHandle { state },
        )
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock_state(&self.state)
    }
}

impl MockTransportHandle {
    /// Queue a reply for the next read.
    pub fn push_reply(&self, reply: &[u8]) {
        lock_state(&self.state).replies.push_back(reply.to_vec());
    }

    /// Make every following write fail, or succeed again.
    pub fn set_fail_writes(&self, fail: bool) {
        lock_state(&self.state).fail_writes = fail;
    }

    /// All successful writes, oldest first.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock_state(&self.state).written.clone()
    }

    /// Successful writes as strings, convenient for ASCII protocols.
    pub fn written_strings(&self) -> Vec<String> {
        self.written()
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// The currently open device and its rate.
    pub fn opened(&self) -> Option<(String, BaudRate)> {
        lock_state(&self.state).opened.clone()
    }

    /// Number of times the transport has been opened.
    pub fn num_opens(&self) -> usize {
        lock_state(&self.state).num_opens
    }
}

impl SerialTransport for MockTransport {
    fn open(&mut self, path: &str, baud: BaudRate) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.opened = Some((path.to_string(), baud));
        state.num_opens += 1;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.lock();

        if state.opened.is_none() {
            return Err(TransportError::NotOpen);
        }
        if state.fail_writes {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }

        state.written.push(data.to_vec());
        Ok(())
    }

    fn read_exact(&mut self, len: usize, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let mut state = self.lock();

        if state.opened.is_none() {
            return Err(TransportError::NotOpen);
        }

        match state.replies.pop_front() {
            Some(r) if r.len() >= len => Ok(r[..len].to_vec()),
            Some(r) => Err(TransportError::Timeout {
                expected: len,
                got: r.len(),
            }),
            None => Err(TransportError::Timeout {
                expected: len,
                got: 0,
            }),
        }
    }

    fn close(&mut self) {
        self.lock().opened = None;
    }

    fn is_open(&self) -> bool {
        self.lock().opened.is_some()
    }
}

impl MockEnumerator {
    pub fn new(devices: Vec<String>) -> Self {
        Self { devices }
    }
}

impl DeviceEnumerator for MockEnumerator {
    fn list_devices(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.devices.clone())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Lock the state, recovering it if a panicking test poisoned the mutex.
fn lock_state(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_transport() {
        let (mut t, handle) = MockTransport::new();

        assert!(matches!(t.write(b"#0P1500\r"), Err(TransportError::NotOpen)));

        t.open("/dev/ttyUSB0", BaudRate::B115200).unwrap();
        assert!(t.is_open());
        assert_eq!(
            handle.opened(),
            Some(("/dev/ttyUSB0".to_string(), BaudRate::B115200))
        );

        t.write(b"#0P1500\r").unwrap();
        assert_eq!(handle.written_strings(), vec!["#0P1500\r".to_string()]);

        handle.push_reply(&[42]);
        assert_eq!(t.read_exact(1, Duration::from_millis(10)).unwrap(), vec![42]);
        assert!(matches!(
            t.read_exact(1, Duration::from_millis(10)),
            Err(TransportError::Timeout { expected: 1, got: 0 })
        ));

        handle.set_fail_writes(true);
        assert!(matches!(t.write(b"VH\r"), Err(TransportError::Io(_))));

        t.close();
        assert!(!t.is_open());
    }
}
