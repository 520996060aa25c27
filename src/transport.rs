//! Transport layer abstraction for HydraBus communication
//!
//! The binary protocol only needs a duplex byte stream with
//! blocking-with-timeout reads; this module provides the trait and the
//! serial port implementation used for a real device.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::constants::DEFAULT_BAUD_RATE;
use crate::error::Result;

/// Transport trait for reading and writing bytes
///
/// Implementations must not buffer writes beyond the call and must bound
/// every read by the given timeout; a missing response is otherwise
/// indistinguishable from one that has not been sent yet.
pub trait Transport {
    /// Write all bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `max_len` bytes, waiting at most `timeout`
    ///
    /// Returns an empty buffer if nothing arrived before the timeout.
    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>>;

    /// Discard any stale bytes waiting in the input buffer
    fn flush_input(&mut self) -> Result<()>;
}

/// Serial port transport
///
/// HydraBus enumerates as a CDC-ACM device, so the baud rate is nominal,
/// but it is set anyway for adapters that care.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port with the specified baud rate
    ///
    /// If `baud` is `None`, the default of 115200 is used.
    pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
        let baud_rate = baud.unwrap_or(DEFAULT_BAUD_RATE);

        let port = serialport::new(device, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_secs(5))
            .open()?;

        log::info!("Opened serial port {} at {} baud", device, baud_rate);

        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>> {
        self.port.set_timeout(timeout)?;

        let mut buf = vec![0u8; max_len];
        match self.port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn flush_input(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted in-memory transport for protocol tests

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct MockInner {
        responses: VecDeque<Vec<u8>>,
        writes: Vec<Vec<u8>>,
        flushes: usize,
    }

    /// Mock transport that replays a scripted sequence of device responses
    ///
    /// Each queued chunk satisfies exactly one `read` call (truncated to the
    /// caller's `max_len`, remainder re-queued); an empty chunk or an empty
    /// queue simulates a read timeout. All writes are recorded. Clones share
    /// the same state, so a test can keep one handle for inspection while
    /// the session owns another.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        inner: Rc<RefCell<MockInner>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a device response for a future read
        pub fn push_response(&self, data: &[u8]) {
            self.inner.borrow_mut().responses.push_back(data.to_vec());
        }

        /// Every buffer passed to `write`, in order
        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.inner.borrow().writes.clone()
        }

        /// Number of `flush_input` calls so far
        pub fn flushes(&self) -> usize {
            self.inner.borrow().flushes
        }
    }

    impl Transport for MockTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.inner.borrow_mut().writes.push(data.to_vec());
            Ok(())
        }

        fn read(&mut self, max_len: usize, _timeout: Duration) -> Result<Vec<u8>> {
            let mut inner = self.inner.borrow_mut();
            match inner.responses.pop_front() {
                Some(mut chunk) => {
                    if chunk.len() > max_len {
                        let rest = chunk.split_off(max_len);
                        inner.responses.push_front(rest);
                    }
                    Ok(chunk)
                }
                None => Ok(Vec::new()),
            }
        }

        fn flush_input(&mut self) -> Result<()> {
            self.inner.borrow_mut().flushes += 1;
            Ok(())
        }
    }
}
