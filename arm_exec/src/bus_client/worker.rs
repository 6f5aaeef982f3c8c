//! Bus worker thread, the only user of the serial transport.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Instant;

use crossbeam_channel::{select, tick, Receiver, Sender};
use log::{debug, error, info, trace, warn};

use comms_if::{
    eqpt::ssc::{encode_move, AnalogReadRequest, MoveFrame, ServoCommand},
    serial::{BaudRate, SerialTransport, TransportError},
};

use super::{throttle::Throttle, BusConfig};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Messages from the control loop to the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    /// A single servo command, subject to throttling
    Joint(ServoCommand),

    /// A multi servo frame, sent as soon as it arrives
    Frame(MoveFrame),

    /// Close the current device and open the given one, if any
    SelectPort(Option<String>),

    /// Change the line rate, reopening the current device
    SetBaud(BaudRate),

    /// Close the device and end the worker
    Stop,
}

/// Events reported by the worker back to the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// A new raw pressure reading
    Pressure(f64),

    /// A device was opened
    PortOpened(String),

    /// A device could not be opened
    OpenFailed(String),

    /// A write to the device failed, the data was dropped. `consecutive`
    /// counts the failures since the last successful write.
    WriteFailed { error: String, consecutive: u64 },

    /// A read from the device failed
    ReadFailed(String),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

struct Worker {
    transport: Box<dyn SerialTransport>,
    config: BusConfig,
    pressure_req: AnalogReadRequest,
    throttle: Throttle,
    port: Option<String>,
    baud: BaudRate,
    num_consec_write_failures: u64,
    event_sender: Sender<BusEvent>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

pub(super) fn worker_thread(
    transport: Box<dyn SerialTransport>,
    config: BusConfig,
    pressure_req: AnalogReadRequest,
    port: Option<String>,
    receiver: Receiver<BusMessage>,
    event_sender: Sender<BusEvent>,
) {
    let poll_ticker = tick(config.poll_period);
    let flush_ticker = tick(config.flush_period);

    let mut worker = Worker {
        transport,
        throttle: Throttle::new(config.throttle_period),
        baud: config.baud,
        config,
        pressure_req,
        port,
        num_consec_write_failures: 0,
        event_sender,
    };

    worker.reopen();

    loop {
        select! {
            recv(receiver) -> msg => match msg {
                Ok(BusMessage::Stop) | Err(_) => break,
                Ok(msg) => worker.handle(msg),
            },
            recv(poll_ticker) -> _ => worker.poll_pressure(),
            recv(flush_ticker) -> _ => worker.flush(),
        }
    }

    worker.transport.close();
    info!("Bus worker stopped");
}

impl Worker {
    fn handle(&mut self, msg: BusMessage) {
        trace!("Bus message {:?}", msg);

        match msg {
            BusMessage::Joint(cmd) => {
                if let Some(cmd) = self.throttle.offer(cmd, Instant::now()) {
                    self.write_cmds(&[cmd], None);
                }
            }
            BusMessage::Frame(frame) => {
                // Anything still held for these channels is now stale
                for cmd in frame.cmds.iter() {
                    self.throttle.discard(cmd.channel);
                }
                self.write_cmds(&frame.cmds, frame.time_ms);
            }
            BusMessage::SelectPort(port) => {
                self.port = port;
                self.reopen();
            }
            BusMessage::SetBaud(baud) => {
                info!("Baud rate set to {}", baud);
                self.baud = baud;
                self.reopen();
            }
            BusMessage::Stop => (),
        }
    }

    /// Close the transport and open the current port, if any.
    fn reopen(&mut self) {
        self.transport.close();

        let path = match self.port {
            Some(ref p) => p.clone(),
            None => {
                info!("No serial device selected");
                return;
            }
        };

        match self.transport.open(&path, self.baud) {
            Ok(()) => {
                info!("Opened {} at {} baud", path, self.baud);
                self.send_event(BusEvent::PortOpened(path));
            }
            Err(e) => {
                error!("{}", e);
                self.send_event(BusEvent::OpenFailed(e.to_string()));
            }
        }
    }

    fn flush(&mut self) {
        let due = self.throttle.due(Instant::now());

        for cmd in due {
            self.write_cmds(&[cmd], None);
        }
    }

    fn write_cmds(&mut self, cmds: &[ServoCommand], time_ms: Option<i32>) {
        let result = match encode_move(cmds, time_ms) {
            Ok(bytes) => self.transport.write(&bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => self.num_consec_write_failures = 0,
            Err(e) => {
                warn!("Could not send servo commands: {}", e);
                self.write_failed(e);
            }
        }
    }

    fn write_failed(&mut self, error: String) {
        self.num_consec_write_failures += 1;
        self.send_event(BusEvent::WriteFailed {
            error,
            consecutive: self.num_consec_write_failures,
        });
    }

    /// Request and read the pressure sensor.
    ///
    /// A reply with no data keeps the last reading, so no event is sent.
    fn poll_pressure(&mut self) {
        if !self.transport.is_open() {
            return;
        }

        if let Err(e) = self.transport.write(&self.pressure_req.encode()) {
            warn!("Could not request pressure: {}", e);
            self.write_failed(e.to_string());
            return;
        }
        self.num_consec_write_failures = 0;

        let reply = self
            .transport
            .read_exact(self.pressure_req.reply_len(), self.config.read_timeout);

        match reply {
            Ok(bytes) => match self.pressure_req.decode_reply(&bytes) {
                Ok(values) => {
                    if let Some(v) = values.first() {
                        self.send_event(BusEvent::Pressure(*v as f64));
                    }
                }
                Err(e) => {
                    warn!("Bad pressure reply: {}", e);
                    self.send_event(BusEvent::ReadFailed(e.to_string()));
                }
            },
            Err(TransportError::Timeout { got: 0, .. }) => {
                debug!("No pressure data");
            }
            Err(e) => {
                warn!("Could not read pressure: {}", e);
                self.send_event(BusEvent::ReadFailed(e.to_string()));
            }
        }
    }

    fn send_event(&self, event: BusEvent) {
        // The client going away ends the worker through its message channel
        self.event_sender.send(event).ok();
    }
}
