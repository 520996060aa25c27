//! Error types for the HydraBus library
//!
//! This module defines the error types used throughout the library
//! for handling transport failures and binary protocol errors.

use thiserror::Error;

use crate::mode::Mode;

/// Result type alias for HydraBus operations
pub type Result<T> = std::result::Result<T, HydraBusError>;

/// Error types for HydraBus operations
#[derive(Error, Debug)]
pub enum HydraBusError {
    /// Serial port error from the serialport library
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error on the transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host and device disagree on framing; the session must be re-established
    #[error("protocol desynchronized: {0}")]
    ProtocolDesync(&'static str),

    /// The device identified as a different sub-mode than requested
    #[error("device identified as {actual:02X?} while entering {expected} mode")]
    UnexpectedMode {
        /// Name of the sub-mode that was requested
        expected: &'static str,
        /// Identification bytes the device actually returned
        actual: Vec<u8>,
    },

    /// The operation is not legal in the session's current mode
    #[error("{operation} is not allowed while in {mode}")]
    InvalidState {
        /// What was attempted
        operation: &'static str,
        /// The mode the session was in
        mode: Mode,
    },

    /// A caller-supplied value is outside the sub-mode's legal range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The device rejected a command with its error status byte
    #[error("command 0x{opcode:02X} rejected by device")]
    Nack {
        /// Opcode of the rejected command
        opcode: u8,
    },

    /// A non-idempotent command's response could not be confirmed; the
    /// bus-side effect is of unknown completion
    #[error("transaction 0x{opcode:02X} unconfirmed; bus side effect unknown")]
    TransactionFailed {
        /// Opcode of the unconfirmed command
        opcode: u8,
    },
}

impl HydraBusError {
    /// Check if this error is fatal to the session
    ///
    /// Fatal errors require tearing the session down and reconnecting;
    /// everything else leaves the session usable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HydraBusError::Serial(_) | HydraBusError::Io(_) | HydraBusError::ProtocolDesync(_)
        )
    }

    /// Check if this error was raised locally, before any byte was written
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            HydraBusError::InvalidState { .. } | HydraBusError::InvalidParameter(_)
        )
    }
}
