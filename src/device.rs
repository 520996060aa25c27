//! HydraBus session and command dispatcher
//!
//! This module provides the `HydraBus` struct: the single owner of a
//! transport, the state machine tracking which device-side mode is active,
//! and the synchronous request/response engine that every bus driver routes
//! its commands through.

use std::time::Duration;

use crate::can::Can;
use crate::config::{CanConfig, I2cConfig, MmcConfig, OneWireConfig, SpiConfig, UartConfig};
use crate::constants::*;
use crate::error::{HydraBusError, Result};
use crate::frame::{decode, Command, Response, Scope};
use crate::gpio::Gpio;
use crate::i2c::I2c;
use crate::mmc::Mmc;
use crate::mode::{descriptor, BusKind, Mode};
use crate::onewire::OneWire;
use crate::spi::Spi;
use crate::transport::{SerialTransport, Transport};
use crate::uart::Uart;

/// HydraBus session
///
/// Owns the transport and tracks the device-side mode. All operations are
/// synchronous and block until the device confirms or the read times out;
/// exactly one command is ever in flight, because the protocol has no
/// request IDs and whatever comes back next is taken as the answer.
///
/// # Example
///
/// ```no_run
/// use hydrabus::{HydraBus, SpiConfig};
///
/// let mut hb = HydraBus::open("/dev/ttyACM0")?;
/// hb.enter_binary()?;
///
/// let mut spi = hb.spi(SpiConfig::default())?;
/// let id = spi.write_read(&[0x9F], 3)?;
/// println!("JEDEC ID: {:02X?}", id);
/// spi.exit()?;
///
/// hb.disconnect()?;
/// # Ok::<(), hydrabus::HydraBusError>(())
/// ```
pub struct HydraBus<T: Transport> {
    /// Byte-stream transport to the device
    transport: T,
    /// Last device-confirmed mode
    mode: Mode,
    /// Version byte from the bound sub-mode's identification signature
    version: Option<u8>,
    /// Per-read timeout for command responses
    timeout: Duration,
}

impl HydraBus<SerialTransport> {
    /// Open a serial device and connect the session
    ///
    /// The returned session is in console mode, ready for `enter_binary`.
    pub fn open(device: &str) -> Result<Self> {
        let transport = SerialTransport::open(device, None)?;
        let mut hb = Self::new(transport);
        hb.connect()?;
        Ok(hb)
    }
}

impl<T: Transport> HydraBus<T> {
    /// Create a session over an already-opened transport
    ///
    /// The session starts disconnected; call `connect` before anything else.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mode: Mode::Disconnected,
            version: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Last device-confirmed mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Protocol version byte reported by the bound sub-mode, if any
    pub fn protocol_version(&self) -> Option<u8> {
        self.version
    }

    /// Set the per-read response timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    // ---- Mode transitions ----

    /// Attach to the device console
    ///
    /// Validates the transport by discarding any stale input; no protocol
    /// bytes are sent.
    pub fn connect(&mut self) -> Result<()> {
        if self.mode != Mode::Disconnected {
            return Err(HydraBusError::InvalidState {
                operation: "connect",
                mode: self.mode,
            });
        }
        self.transport.flush_input()?;
        self.mode = Mode::Console;
        Ok(())
    }

    /// Switch the device from its text console into binary bridge mode
    ///
    /// The device may be mid-way through printing console text when the
    /// probe is sent and can swallow the first attempts, so the 0x00 probe
    /// is repeated until the `BBIO1` signature shows up in the response
    /// stream or the attempt budget runs out.
    pub fn enter_binary(&mut self) -> Result<()> {
        if self.mode != Mode::Console {
            return Err(HydraBusError::InvalidState {
                operation: "binary mode entry",
                mode: self.mode,
            });
        }

        let poll = Duration::from_millis(HANDSHAKE_POLL_TIMEOUT_MS);
        let mut window: Vec<u8> = Vec::new();
        for attempt in 1..=BBIO_ENTER_ATTEMPTS {
            self.transport.write(&[BBIO_ENTER])?;
            let chunk = self.transport.read(16, poll)?;
            window.extend_from_slice(&chunk);

            if window
                .windows(BBIO_SIGNATURE.len())
                .any(|w| w == BBIO_SIGNATURE)
            {
                self.transport.flush_input()?;
                self.mode = Mode::BinaryBridge;
                log::debug!("Entered binary bridge after {} probe(s)", attempt);
                return Ok(());
            }

            // Console noise; keep only enough tail to complete a signature
            let keep = window.len().min(BBIO_SIGNATURE.len() - 1);
            window.drain(..window.len() - keep);
        }

        log::error!(
            "No binary mode acknowledgement after {} probes",
            BBIO_ENTER_ATTEMPTS
        );
        Err(HydraBusError::ProtocolDesync(
            "binary mode entry attempts exhausted",
        ))
    }

    /// Bind a bus sub-mode
    ///
    /// Legal from the binary bridge, or from another sub-mode (which is
    /// exited first; the switch is never left half-applied). The device's
    /// identification response is verified against the descriptor table
    /// rather than trusting the host's last-known state.
    pub fn enter_mode(&mut self, kind: BusKind) -> Result<()> {
        match self.mode {
            Mode::BinaryBridge => {}
            Mode::Bound(_) => self.exit_mode()?,
            other => {
                return Err(HydraBusError::InvalidState {
                    operation: "sub-mode entry",
                    mode: other,
                })
            }
        }

        let desc = descriptor(kind);
        self.transport.write(&[desc.select])?;
        let raw = self.read_exact(MODE_SIGNATURE_LEN)?;

        if raw.is_empty() {
            return Err(HydraBusError::ProtocolDesync(
                "no identification response to sub-mode select",
            ));
        }
        if raw != desc.signature {
            log::warn!(
                "Expected {} signature {:02X?}, device answered {:02X?}",
                kind,
                desc.signature,
                raw
            );
            // The device is only reliably addressable from the bridge, so
            // try to pull it back there before reporting the mismatch
            self.transport.flush_input()?;
            if self.probe_bridge_exit().is_err() {
                log::warn!("Forced exit after mode mismatch was not acknowledged");
            }
            return Err(HydraBusError::UnexpectedMode {
                expected: desc.kind.name(),
                actual: raw,
            });
        }

        self.version = Some(raw[MODE_SIGNATURE_LEN - 1]);
        self.mode = Mode::Bound(kind);
        log::debug!("Bound {} (version byte 0x{:02X})", kind, raw[3]);
        Ok(())
    }

    /// Exit the bound sub-mode back to the binary bridge
    pub fn exit_mode(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Bound(_)) {
            return Err(HydraBusError::InvalidState {
                operation: "sub-mode exit",
                mode: self.mode,
            });
        }
        self.probe_bridge_exit()?;
        self.mode = Mode::BinaryBridge;
        self.version = None;
        Ok(())
    }

    /// Reset the device from the binary bridge back to its text console
    pub fn exit_binary(&mut self) -> Result<()> {
        if self.mode != Mode::BinaryBridge {
            return Err(HydraBusError::InvalidState {
                operation: "console reset",
                mode: self.mode,
            });
        }
        self.transport.write(&[BBIO_RESET])?;
        // The device reboots its console; nothing is echoed back
        self.transport.flush_input()?;
        self.mode = Mode::Console;
        Ok(())
    }

    /// Tear the session down, unwinding any active mode on a best-effort
    /// basis
    pub fn disconnect(&mut self) -> Result<()> {
        if self.mode == Mode::Disconnected {
            return Ok(());
        }
        self.unwind();
        self.mode = Mode::Disconnected;
        self.version = None;
        Ok(())
    }

    /// Write the exit byte and require the bridge signature back
    fn probe_bridge_exit(&mut self) -> Result<()> {
        self.transport.write(&[BBIO_EXIT_SUBMODE])?;
        let raw = self.read_exact(BBIO_SIGNATURE.len())?;
        if raw == BBIO_SIGNATURE {
            Ok(())
        } else {
            Err(HydraBusError::ProtocolDesync(
                "sub-mode exit not acknowledged",
            ))
        }
    }

    /// Best-effort mode unwind used by `disconnect` and `Drop`
    fn unwind(&mut self) {
        if matches!(self.mode, Mode::Bound(_)) && self.exit_mode().is_err() {
            log::debug!("Sub-mode exit failed during teardown");
        }
        if self.mode == Mode::BinaryBridge && self.exit_binary().is_err() {
            log::debug!("Console reset failed during teardown");
        }
    }

    // ---- Bus drivers ----

    /// Bind SPI mode and apply the configuration
    pub fn spi(&mut self, config: SpiConfig) -> Result<Spi<'_, T>> {
        Spi::bind(self, config)
    }

    /// Bind I2C mode and apply the configuration
    pub fn i2c(&mut self, config: I2cConfig) -> Result<I2c<'_, T>> {
        I2c::bind(self, config)
    }

    /// Bind UART mode and apply the configuration
    pub fn uart(&mut self, config: UartConfig) -> Result<Uart<'_, T>> {
        Uart::bind(self, config)
    }

    /// Bind 1-Wire mode and apply the configuration
    pub fn one_wire(&mut self, config: OneWireConfig) -> Result<OneWire<'_, T>> {
        OneWire::bind(self, config)
    }

    /// Bind CAN mode and apply the configuration
    pub fn can(&mut self, config: CanConfig) -> Result<Can<'_, T>> {
        Can::bind(self, config)
    }

    /// Bind GPIO mode
    pub fn gpio(&mut self) -> Result<Gpio<'_, T>> {
        Gpio::bind(self)
    }

    /// Bind MMC mode and apply the configuration
    pub fn mmc(&mut self, config: MmcConfig) -> Result<Mmc<'_, T>> {
        Mmc::bind(self, config)
    }

    // ---- Command dispatcher ----

    /// Execute one command and return its acknowledged payload
    ///
    /// The command's scope is checked against the current mode before any
    /// byte is written. A Timeout or Malformed outcome on an idempotent
    /// command is retried (identical bytes, bounded budget); on a
    /// non-idempotent command it surfaces immediately as
    /// `TransactionFailed`, since re-sending could duplicate a side effect
    /// on the physical bus.
    pub(crate) fn execute(&mut self, cmd: &Command) -> Result<Vec<u8>> {
        self.check_scope(cmd.scope)?;

        let frame = cmd.encode();
        let attempts = if cmd.idempotent {
            1 + COMMAND_RETRY_LIMIT
        } else {
            1
        };

        for attempt in 1..=attempts {
            if attempt > 1 {
                log::debug!("Re-sending command 0x{:02X} (attempt {})", cmd.opcode, attempt);
                self.transport.flush_input()?;
            }

            self.transport.write(&frame)?;
            let expected = cmd.shape.expected_len();
            let raw = if expected == 0 {
                Vec::new()
            } else {
                self.read_exact(expected)?
            };

            match decode(cmd.shape, &raw) {
                Response::Ack(payload) => return Ok(payload),
                Response::Nack => return Err(HydraBusError::Nack { opcode: cmd.opcode }),
                Response::Timeout => {
                    log::warn!("Command 0x{:02X} timed out", cmd.opcode);
                }
                Response::Malformed(bytes) => {
                    log::warn!(
                        "Command 0x{:02X} got malformed response {:02X?}",
                        cmd.opcode,
                        bytes
                    );
                }
            }

            if !cmd.idempotent {
                return Err(HydraBusError::TransactionFailed { opcode: cmd.opcode });
            }
        }

        Err(HydraBusError::ProtocolDesync("command retries exhausted"))
    }

    /// Read bytes straight off the transport while a sub-mode is bound
    ///
    /// Used by streaming sub-modes (UART RX echo) where the data is not a
    /// response to any command.
    pub(crate) fn read_raw(&mut self, kind: BusKind, max_len: usize) -> Result<Vec<u8>> {
        if self.mode != Mode::Bound(kind) {
            return Err(HydraBusError::InvalidState {
                operation: "raw bus read",
                mode: self.mode,
            });
        }
        self.transport.read(max_len, self.timeout)
    }

    /// Verify a command is legal in the current mode, before any I/O
    fn check_scope(&self, scope: Scope) -> Result<()> {
        let legal = match scope {
            Scope::Bridge => self.mode == Mode::BinaryBridge,
            Scope::Bus(kind) => self.mode == Mode::Bound(kind),
        };
        if legal {
            Ok(())
        } else {
            Err(HydraBusError::InvalidState {
                operation: scope.operation(),
                mode: self.mode,
            })
        }
    }

    /// Accumulate exactly `len` response bytes, or fewer on timeout
    ///
    /// Returns a short (possibly empty) buffer once a read comes back
    /// empty; classification of partial data is the codec's job.
    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(len);
        while buf.len() < len {
            let chunk = self.transport.read(len - buf.len(), self.timeout)?;
            if chunk.is_empty() {
                break;
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }
}

impl<T: Transport> Drop for HydraBus<T> {
    fn drop(&mut self) {
        // Never leave the device stuck in a sub-mode
        let _ = self.disconnect();
    }
}
