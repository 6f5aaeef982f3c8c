//! # Bus client
//!
//! The bus client owns the connection to the servo controller. All traffic
//! runs on a single worker thread so that writes and write-then-read pairs
//! never interleave. The control loop talks to the worker through messages
//! and picks up its events once per cycle.
//!
//! Single joint commands are throttled per channel, frames are sent
//! immediately. The pressure sensor is polled on a fixed period while a
//! device is open.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod throttle;
mod worker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{info, warn};
use std::{
    thread::{self, JoinHandle},
    time::Duration,
};
use thiserror::Error;

// Internal
use comms_if::{
    eqpt::ssc::{AnalogReadRequest, MoveFrame, ServoCommand, SscError},
    serial::{BaudRate, SerialTransport},
};

pub use throttle::Throttle;
pub use worker::{BusEvent, BusMessage};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Timing and addressing of the bus.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Initial line rate
    pub baud: BaudRate,

    /// Minimum time between single commands on one channel
    pub throttle_period: Duration,

    /// How often held commands are checked for release
    pub flush_period: Duration,

    /// Time between pressure requests
    pub poll_period: Duration,

    /// Longest wait for a pressure reply
    pub read_timeout: Duration,

    /// Analog input of the pressure sensor, `A` to `H`
    pub pressure_channel: char,
}

/// Handle onto the bus worker.
pub struct BusClient {
    sender: Sender<BusMessage>,
    events: Receiver<BusEvent>,
    worker_jh: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BusClientError {
    #[error("Invalid pressure channel: {0}")]
    InvalidPressureChannel(SscError),

    #[error("Could not start the bus worker: {0}")]
    SpawnFailed(std::io::Error),

    #[error("The bus worker has stopped")]
    WorkerStopped,

    #[error("The bus worker panicked")]
    WorkerPanicked,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            baud: BaudRate::default(),
            throttle_period: Duration::from_millis(90),
            flush_period: Duration::from_millis(10),
            poll_period: Duration::from_millis(100),
            read_timeout: Duration::from_millis(50),
            pressure_channel: 'H',
        }
    }
}

impl BusClient {
    /// Start the bus worker with the given transport, opening `port` if one
    /// is given.
    pub fn connect(
        config: BusConfig,
        transport: Box<dyn SerialTransport>,
        port: Option<String>,
    ) -> Result<Self, BusClientError> {
        let pressure_req = AnalogReadRequest::new(&[config.pressure_channel])
            .map_err(BusClientError::InvalidPressureChannel)?;

        let (sender, worker_receiver) = unbounded();
        let (event_sender, events) = unbounded();

        let worker_jh = thread::Builder::new()
            .name("bus_worker".into())
            .spawn(move || {
                worker::worker_thread(
                    transport,
                    config,
                    pressure_req,
                    port,
                    worker_receiver,
                    event_sender,
                )
            })
            .map_err(BusClientError::SpawnFailed)?;

        info!("Bus worker started");

        Ok(Self {
            sender,
            events,
            worker_jh: Some(worker_jh),
        })
    }

    /// Queue a single servo command.
    pub fn send_joint(&self, cmd: ServoCommand) -> Result<(), BusClientError> {
        self.send(BusMessage::Joint(cmd))
    }

    /// Queue a multi servo frame.
    pub fn send_frame(&self, frame: MoveFrame) -> Result<(), BusClientError> {
        self.send(BusMessage::Frame(frame))
    }

    /// Switch to a different device, or close the connection with `None`.
    pub fn select_port(&self, port: Option<String>) -> Result<(), BusClientError> {
        self.send(BusMessage::SelectPort(port))
    }

    pub fn set_baud(&self, baud: BaudRate) -> Result<(), BusClientError> {
        self.send(BusMessage::SetBaud(baud))
    }

    /// Take every event reported since the last call.
    pub fn events(&self) -> Vec<BusEvent> {
        self.events.try_iter().collect()
    }

    /// Stop the worker and wait for it to finish.
    pub fn shutdown(mut self) -> Result<(), BusClientError> {
        self.stop_worker()
    }

    fn send(&self, msg: BusMessage) -> Result<(), BusClientError> {
        self.sender
            .send(msg)
            .map_err(|_| BusClientError::WorkerStopped)
    }

    fn stop_worker(&mut self) -> Result<(), BusClientError> {
        match self.worker_jh.take() {
            Some(jh) => {
                // The worker may already have gone, in which case joining is
                // all that's left
                self.sender.send(BusMessage::Stop).ok();
                jh.join().map_err(|_| BusClientError::WorkerPanicked)
            }
            None => Ok(()),
        }
    }
}

impl Drop for BusClient {
    fn drop(&mut self) {
        if let Err(e) = self.stop_worker() {
            warn!("{}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
