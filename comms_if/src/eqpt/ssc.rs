//! # Servo controller protocol
//!
//! ASCII command set spoken by SSC-32 compatible servo controller boards.
//!
//! A move frame positions one or more servos at once:
//!
//! ```text
//! #<ch>P<pw>[S<spd>]#<ch>P<pw>[S<spd>]...[T<ms>]<CR>
//! ```
//!
//! Analog inputs are read with `V<letter>` queries, one per input, closed by
//! a carriage return. The board answers with exactly one raw byte per queried
//! input, so the reply length is known before it arrives.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Pulse width which centres a servo.
///
/// Units: microseconds
pub const CENTRE_PULSE_WIDTH_US: i32 = 1500;

/// Highest servo channel on the board.
pub const MAX_CHANNEL: u8 = 31;

/// Frame terminator.
const CR: u8 = b'\r';

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position demand for a single servo channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoCommand {
    /// Board channel the servo is plugged into
    pub channel: u8,

    /// Demanded pulse width.
    ///
    /// Units: microseconds
    pub pulse_width_us: i32,

    /// Optional move speed.
    ///
    /// Units: microseconds/second
    pub speed: Option<i32>,
}

/// A group of servo demands executed together by the board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveFrame {
    pub cmds: Vec<ServoCommand>,

    /// Time the whole group should take to complete.
    ///
    /// Units: milliseconds
    pub time_ms: Option<i32>,
}

/// A request for the values of one or more analog inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalogReadRequest {
    channels: Vec<char>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SscError {
    #[error("Servo channel {0} is outside the board's range (0-31)")]
    InvalidChannel(u8),

    #[error("'{0}' is not an analog input, expected a letter between A and H")]
    InvalidAnalogInput(char),

    #[error("An analog read must query at least one input")]
    NoAnalogInputs,

    #[error("Expected a {expected} byte reply, got {got} bytes")]
    ShortReply { expected: usize, got: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoCommand {
    /// Create a command without a speed limit.
    pub fn new(channel: u8, pulse_width_us: i32) -> Self {
        Self {
            channel,
            pulse_width_us,
            speed: None,
        }
    }
}

impl MoveFrame {
    /// Build a frame centring every given channel.
    pub fn centre_all(channels: &[u8]) -> Self {
        Self {
            cmds: channels
                .iter()
                .map(|c| ServoCommand::new(*c, CENTRE_PULSE_WIDTH_US))
                .collect(),
            time_ms: None,
        }
    }

    /// Serialise the frame into its wire form.
    pub fn encode(&self) -> Result<Vec<u8>, SscError> {
        encode_move(&self.cmds, self.time_ms)
    }
}

impl AnalogReadRequest {
    /// Create a request for the given inputs, each a letter from `A` to `H`.
    pub fn new(channels: &[char]) -> Result<Self, SscError> {
        if channels.is_empty() {
            return Err(SscError::NoAnalogInputs);
        }

        let mut checked = Vec::with_capacity(channels.len());
        for c in channels {
            let upper = c.to_ascii_uppercase();
            if !('A'..='H').contains(&upper) {
                return Err(SscError::InvalidAnalogInput(*c));
            }
            checked.push(upper);
        }

        Ok(Self { channels: checked })
    }

    /// Serialise the request into its wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.channels.len() * 2 + 1);
        for c in self.channels.iter() {
            buf.push(b'V');
            buf.push(*c as u8);
        }
        buf.push(CR);
        buf
    }

    /// Number of bytes the board sends back.
    pub fn reply_len(&self) -> usize {
        self.channels.len()
    }

    /// Split a raw reply into one value per queried input.
    pub fn decode_reply(&self, reply: &[u8]) -> Result<Vec<u8>, SscError> {
        if reply.len() < self.reply_len() {
            return Err(SscError::ShortReply {
                expected: self.reply_len(),
                got: reply.len(),
            });
        }

        Ok(reply[..self.reply_len()].to_vec())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a move frame for the given servo commands.
///
/// Integers are written in plain decimal with a leading `-` for negative
/// values. An empty command list is valid and yields only the optional time
/// and the terminator.
pub fn encode_move(cmds: &[ServoCommand], time_ms: Option<i32>) -> Result<Vec<u8>, SscError> {
    let mut buf = Vec::with_capacity(cmds.len() * 12 + 8);

    for cmd in cmds {
        if cmd.channel > MAX_CHANNEL {
            return Err(SscError::InvalidChannel(cmd.channel));
        }

        buf.push(b'#');
        push_int(&mut buf, cmd.channel as i64);
        buf.push(b'P');
        push_int(&mut buf, cmd.pulse_width_us as i64);

        if let Some(speed) = cmd.speed {
            buf.push(b'S');
            push_int(&mut buf, speed as i64);
        }
    }

    if let Some(t) = time_ms {
        buf.push(b'T');
        push_int(&mut buf, t as i64);
    }

    buf.push(CR);

    Ok(buf)
}

fn push_int(buf: &mut Vec<u8>, value: i64) {
    buf.extend_from_slice(value.to_string().as_bytes());
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_single_servo_frame() {
        let frame = encode_move(&[ServoCommand::new(0, 1500)], None).unwrap();
        assert_eq!(frame, b"#0P1500\r".to_vec());
    }

    #[test]
    fn test_negative_and_zero_values() {
        let frame = encode_move(&[ServoCommand::new(3, -5)], Some(0)).unwrap();
        assert_eq!(frame, b"#3P-5T0\r".to_vec());
    }

    #[test]
    fn test_multi_servo_frame() {
        let cmds = vec![
            ServoCommand::new(0, 1250),
            ServoCommand {
                channel: 1,
                pulse_width_us: 1800,
                speed: Some(750),
            },
            ServoCommand::new(2, 2500),
        ];

        let frame = encode_move(&cmds, Some(1200)).unwrap();
        assert_eq!(frame, b"#0P1250#1P1800S750#2P2500T1200\r".to_vec());

        assert_eq!(encode_move(&[], None).unwrap(), b"\r".to_vec());
        assert_eq!(
            encode_move(&[ServoCommand::new(32, 1500)], None),
            Err(SscError::InvalidChannel(32))
        );
    }

    #[test]
    fn test_centre_all() {
        let frame = MoveFrame::centre_all(&[0, 1, 2]).encode().unwrap();
        assert_eq!(frame, b"#0P1500#1P1500#2P1500\r".to_vec());
    }

    #[test]
    fn test_analog_read() {
        let req = AnalogReadRequest::new(&['H']).unwrap();
        assert_eq!(req.encode(), b"VH\r".to_vec());
        assert_eq!(req.reply_len(), 1);
        assert_eq!(req.decode_reply(&[200]).unwrap(), vec![200]);

        let req = AnalogReadRequest::new(&['a', 'B']).unwrap();
        assert_eq!(req.encode(), b"VAVB\r".to_vec());
        assert_eq!(
            req.decode_reply(&[12]),
            Err(SscError::ShortReply { expected: 2, got: 1 })
        );

        assert_eq!(
            AnalogReadRequest::new(&['Z']),
            Err(SscError::InvalidAnalogInput('Z'))
        );
        assert_eq!(AnalogReadRequest::new(&[]), Err(SscError::NoAnalogInputs));
    }
}
