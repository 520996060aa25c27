//! 1-Wire bus driver
//!
//! The 1-Wire mode is the leanest of the sub-modes: a reset pulse with no
//! response, single-byte reads, and bulk writes whose status byte follows
//! the data.

use crate::config::OneWireConfig;
use crate::constants::*;
use crate::device::HydraBus;
use crate::error::{HydraBusError, Result};
use crate::frame::{Command, ResponseShape, Scope};
use crate::mode::BusKind;
use crate::transport::Transport;

/// 1-Wire master bound to a session
pub struct OneWire<'a, T: Transport> {
    session: &'a mut HydraBus<T>,
    config: OneWireConfig,
}

const SCOPE: Scope = Scope::Bus(BusKind::OneWire);

impl<'a, T: Transport> OneWire<'a, T> {
    /// Bind 1-Wire mode on the session and push the configuration
    pub(crate) fn bind(session: &'a mut HydraBus<T>, config: OneWireConfig) -> Result<Self> {
        session.enter_mode(BusKind::OneWire)?;
        let mut ow = Self { session, config };
        ow.apply_config()?;
        Ok(ow)
    }

    /// The configuration currently applied
    pub fn config(&self) -> OneWireConfig {
        self.config
    }

    fn apply_config(&mut self) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            ONEWIRE_CMD_CONFIG_BASE | self.config.config_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Send a reset pulse
    ///
    /// The device answers nothing; presence detection is up to the
    /// following ROM command exchange.
    pub fn reset(&mut self) -> Result<()> {
        let cmd =
            Command::new(SCOPE, ONEWIRE_CMD_RESET, vec![], ResponseShape::None).non_idempotent();
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Clock one byte in
    pub fn read_byte(&mut self) -> Result<u8> {
        let cmd = Command::new(SCOPE, ONEWIRE_CMD_READ_BYTE, vec![], ResponseShape::Fixed(1))
            .non_idempotent();
        let payload = self.session.execute(&cmd)?;
        Ok(payload[0])
    }

    /// Read bytes one at a time
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut result = Vec::with_capacity(len);
        for _ in 0..len {
            result.push(self.read_byte()?);
        }
        Ok(result)
    }

    /// Write up to 16 bytes in one bulk transfer
    ///
    /// The status byte arrives after the data has been clocked out.
    pub fn bulk_write(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(HydraBusError::InvalidParameter(
                "bulk write needs at least one byte".into(),
            ));
        }
        if data.len() > BULK_MAX_LEN {
            return Err(HydraBusError::InvalidParameter(format!(
                "bulk write limited to {} bytes, got {}",
                BULK_MAX_LEN,
                data.len()
            )));
        }

        let cmd = Command::new(
            SCOPE,
            CMD_BULK_BASE | (data.len() - 1) as u8,
            data.to_vec(),
            ResponseShape::Status,
        )
        .non_idempotent();
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Write bytes, chunked into bulk transfers
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        for chunk in data.chunks(BULK_MAX_LEN) {
            self.bulk_write(chunk)?;
        }
        Ok(())
    }

    /// Exit 1-Wire mode back to the binary bridge
    pub fn exit(self) -> Result<()> {
        self.session.exit_mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn onewire_session(mock: &MockTransport) -> HydraBus<MockTransport> {
        let mut hb = HydraBus::new(mock.clone());
        hb.connect().unwrap();
        mock.push_response(b"BBIO1");
        hb.enter_binary().unwrap();
        mock.push_response(b"1W01");
        mock.push_response(&[STATUS_OK]); // config (pullup on by default)
        hb
    }

    #[test]
    fn test_reset_expects_no_response() {
        let mock = MockTransport::new();
        let mut hb = onewire_session(&mock);
        let mut ow = hb.one_wire(OneWireConfig::default()).unwrap();

        // No response queued; reset must still succeed
        ow.reset().unwrap();
        let writes = mock.writes();
        assert_eq!(writes[writes.len() - 1], vec![ONEWIRE_CMD_RESET]);
    }

    #[test]
    fn test_rom_read_sequence() {
        let mock = MockTransport::new();
        let mut hb = onewire_session(&mock);
        let mut ow = hb.one_wire(OneWireConfig::default()).unwrap();

        ow.reset().unwrap();
        mock.push_response(&[STATUS_OK]);
        ow.write(&[0x33]).unwrap(); // READ ROM
        for b in [0x28, 0xFF, 0x4C] {
            mock.push_response(&[b]);
        }
        let rom = ow.read(3).unwrap();
        assert_eq!(rom, vec![0x28, 0xFF, 0x4C]);
    }

    #[test]
    fn test_default_config_keeps_pullup() {
        let mock = MockTransport::new();
        let mut hb = onewire_session(&mock);
        hb.one_wire(OneWireConfig::default()).unwrap();
        let writes = mock.writes();
        assert_eq!(writes[writes.len() - 1], vec![0b0100_0100]);
    }
}
