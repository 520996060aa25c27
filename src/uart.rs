//! UART bridge driver
//!
//! Transmit goes through framed bulk-write commands; receive is a raw
//! stream (the device echoes line bytes as they arrive once RX echo is
//! enabled), so reads bypass the command framing and go straight to the
//! timed transport read.

use crate::config::{UartBaud, UartConfig};
use crate::constants::*;
use crate::device::HydraBus;
use crate::error::{HydraBusError, Result};
use crate::frame::{Command, ResponseShape, Scope};
use crate::mode::BusKind;
use crate::transport::Transport;

/// UART bridge bound to a session
pub struct Uart<'a, T: Transport> {
    session: &'a mut HydraBus<T>,
    config: UartConfig,
    echo: bool,
}

const SCOPE: Scope = Scope::Bus(BusKind::Uart);

impl<'a, T: Transport> Uart<'a, T> {
    /// Bind UART mode on the session and push the configuration
    pub(crate) fn bind(session: &'a mut HydraBus<T>, config: UartConfig) -> Result<Self> {
        session.enter_mode(BusKind::Uart)?;
        let mut uart = Self {
            session,
            config,
            echo: false,
        };
        uart.apply_config()?;
        Ok(uart)
    }

    /// The configuration currently applied
    pub fn config(&self) -> UartConfig {
        self.config
    }

    fn apply_config(&mut self) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            UART_CMD_SET_SPEED_BASE | self.config.baud.to_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;

        let cmd = Command::new(
            SCOPE,
            UART_CMD_CONFIG_BASE | self.config.config_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Change the line baud rate
    pub fn set_baud(&mut self, baud: UartBaud) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            UART_CMD_SET_SPEED_BASE | baud.to_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        self.config.baud = baud;
        Ok(())
    }

    /// Start or stop echoing received line bytes to the host
    pub fn set_echo(&mut self, enable: bool) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            UART_CMD_ECHO_BASE | enable as u8,
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        self.echo = enable;
        Ok(())
    }

    /// Transmit bytes on the line
    ///
    /// Chunked into 16-byte bulk writes, each confirmed before the next.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(HydraBusError::InvalidParameter(
                "write needs at least one byte".into(),
            ));
        }
        for chunk in data.chunks(BULK_MAX_LEN) {
            let cmd = Command::new(
                SCOPE,
                CMD_BULK_BASE | (chunk.len() - 1) as u8,
                chunk.to_vec(),
                ResponseShape::Status,
            )
            .non_idempotent();
            self.session.execute(&cmd)?;
        }
        Ok(())
    }

    /// Receive up to `max_len` echoed line bytes
    ///
    /// Returns whatever arrived within the session timeout, possibly
    /// nothing. RX echo must be enabled first.
    pub fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if !self.echo {
            return Err(HydraBusError::InvalidParameter(
                "RX echo is not enabled".into(),
            ));
        }
        self.session.read_raw(BusKind::Uart, max_len)
    }

    /// Exit UART mode back to the binary bridge
    pub fn exit(mut self) -> Result<()> {
        if self.echo {
            // A still-echoing device would corrupt the exit handshake
            self.set_echo(false)?;
        }
        self.session.exit_mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn uart_session(mock: &MockTransport) -> HydraBus<MockTransport> {
        let mut hb = HydraBus::new(mock.clone());
        hb.connect().unwrap();
        mock.push_response(b"BBIO1");
        hb.enter_binary().unwrap();
        mock.push_response(b"ART1");
        mock.push_response(&[STATUS_OK]); // baud
        mock.push_response(&[STATUS_OK]); // config
        hb
    }

    #[test]
    fn test_write_chunks_bulk_commands() {
        let mock = MockTransport::new();
        let mut hb = uart_session(&mock);
        let mut uart = hb.uart(UartConfig::default()).unwrap();

        let data: Vec<u8> = (0..20).collect();
        mock.push_response(&[STATUS_OK]);
        mock.push_response(&[STATUS_OK]);
        uart.write(&data).unwrap();

        let writes = mock.writes();
        let n = writes.len();
        // 16-byte chunk then 4-byte chunk
        assert_eq!(writes[n - 2][0], CMD_BULK_BASE | 15);
        assert_eq!(writes[n - 2].len(), 17);
        assert_eq!(writes[n - 1][0], CMD_BULK_BASE | 3);
        assert_eq!(writes[n - 1].len(), 5);
    }

    #[test]
    fn test_read_requires_echo() {
        let mock = MockTransport::new();
        let mut hb = uart_session(&mock);
        let mut uart = hb.uart(UartConfig::default()).unwrap();
        assert!(matches!(
            uart.read(16),
            Err(HydraBusError::InvalidParameter(_))
        ));

        mock.push_response(&[STATUS_OK]);
        uart.set_echo(true).unwrap();
        mock.push_response(b"hello");
        assert_eq!(uart.read(16).unwrap(), b"hello");
    }

    #[test]
    fn test_exit_stops_echo_first() {
        let mock = MockTransport::new();
        let mut hb = uart_session(&mock);
        let mut uart = hb.uart(UartConfig::default()).unwrap();
        mock.push_response(&[STATUS_OK]);
        uart.set_echo(true).unwrap();

        mock.push_response(&[STATUS_OK]); // echo off
        mock.push_response(b"BBIO1"); // exit
        uart.exit().unwrap();

        let writes = mock.writes();
        let n = writes.len();
        assert_eq!(writes[n - 2], vec![UART_CMD_ECHO_BASE]);
        assert_eq!(writes[n - 1], vec![BBIO_EXIT_SUBMODE]);
        assert_eq!(hb.mode(), crate::mode::Mode::BinaryBridge);
    }
}
