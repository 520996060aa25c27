//! Command framing and response classification
//!
//! This module provides the `Command` struct describing one device
//! transaction and the pure encode/decode pair that maps it onto the wire.
//! No I/O and no retry logic lives here; the dispatcher in `device` owns
//! both.

use crate::constants::{STATUS_ERROR, STATUS_OK};
use crate::mode::BusKind;

/// Where a command is legal to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only in the binary bridge, outside any sub-mode
    Bridge,
    /// Only while the named sub-mode is bound
    Bus(BusKind),
}

impl Scope {
    /// Short description used in `InvalidState` errors
    pub fn operation(&self) -> &'static str {
        match self {
            Scope::Bridge => "bridge command",
            Scope::Bus(BusKind::Spi) => "SPI command",
            Scope::Bus(BusKind::I2c) => "I2C command",
            Scope::Bus(BusKind::Uart) => "UART command",
            Scope::Bus(BusKind::OneWire) => "1-Wire command",
            Scope::Bus(BusKind::Can) => "CAN command",
            Scope::Bus(BusKind::Gpio) => "GPIO command",
            Scope::Bus(BusKind::Mmc) => "MMC command",
        }
    }
}

/// Expected shape of a device response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// The device sends nothing back
    None,
    /// A single status byte (0x01 ok / 0x00 error)
    Status,
    /// A status byte followed by a fixed-length payload
    StatusThen(usize),
    /// A fixed-length payload with no status byte
    Fixed(usize),
}

impl ResponseShape {
    /// Total number of bytes to read for this shape
    pub fn expected_len(&self) -> usize {
        match self {
            ResponseShape::None => 0,
            ResponseShape::Status => 1,
            ResponseShape::StatusThen(n) => 1 + n,
            ResponseShape::Fixed(n) => *n,
        }
    }
}

/// One device transaction: opcode, parameters, and the expected response
///
/// Immutable once constructed; drivers build commands and hand them to the
/// dispatcher, which maps one `Command` to exactly one wire exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Opcode byte, including any bits packed into it (lengths, levels)
    pub opcode: u8,
    /// Parameter bytes sent after the opcode
    pub params: Vec<u8>,
    /// Expected response shape
    pub shape: ResponseShape,
    /// Whether re-sending after an ambiguous outcome is safe
    pub idempotent: bool,
    /// Mode in which this command is legal
    pub scope: Scope,
}

impl Command {
    /// Create a new idempotent command
    pub fn new(scope: Scope, opcode: u8, params: Vec<u8>, shape: ResponseShape) -> Self {
        Self {
            opcode,
            params,
            shape,
            idempotent: true,
            scope,
        }
    }

    /// Mark the command as non-idempotent (re-sending could duplicate a
    /// physical bus side effect)
    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }

    /// Encode the command into the exact byte sequence sent to the device
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + self.params.len());
        buf.push(self.opcode);
        buf.extend_from_slice(&self.params);
        buf
    }
}

/// Outcome of one device transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The device acknowledged; payload bytes follow the shape
    Ack(Vec<u8>),
    /// The device reported its explicit error status
    Nack,
    /// No bytes arrived before the timeout
    Timeout,
    /// Bytes arrived but violate the expected shape; carries the raw bytes
    /// for resynchronization diagnostics
    Malformed(Vec<u8>),
}

/// Classify raw response bytes against an expected shape
///
/// Pure function: the same inputs always produce the same classification.
pub fn decode(shape: ResponseShape, raw: &[u8]) -> Response {
    if raw.is_empty() {
        return match shape {
            ResponseShape::None => Response::Ack(Vec::new()),
            _ => Response::Timeout,
        };
    }

    match shape {
        // Bytes where none were expected
        ResponseShape::None => Response::Malformed(raw.to_vec()),
        ResponseShape::Status => match raw {
            [STATUS_OK] => Response::Ack(Vec::new()),
            [STATUS_ERROR] => Response::Nack,
            _ => Response::Malformed(raw.to_vec()),
        },
        ResponseShape::StatusThen(n) => {
            if raw == [STATUS_ERROR] {
                Response::Nack
            } else if raw.len() == 1 + n && raw[0] == STATUS_OK {
                Response::Ack(raw[1..].to_vec())
            } else {
                Response::Malformed(raw.to_vec())
            }
        }
        ResponseShape::Fixed(n) => {
            if raw.len() == n {
                Response::Ack(raw.to_vec())
            } else {
                Response::Malformed(raw.to_vec())
            }
        }
    }
}
