//! I2C bus driver
//!
//! Exposes the raw condition/byte primitives (start, stop, read byte,
//! ack/nack) as well as the composite write-then-read transaction and a
//! bus scan built on them.

use crate::config::{I2cConfig, I2cSpeed};
use crate::constants::*;
use crate::device::HydraBus;
use crate::error::{HydraBusError, Result};
use crate::frame::{Command, ResponseShape, Scope};
use crate::mode::BusKind;
use crate::transport::Transport;

/// I2C master bound to a session
///
/// # Example
///
/// ```no_run
/// use hydrabus::{HydraBus, I2cConfig, I2cSpeed};
///
/// let mut hb = HydraBus::open("/dev/ttyACM0")?;
/// hb.enter_binary()?;
///
/// // Read 64 bytes from an EEPROM at address 0x50
/// let mut i2c = hb.i2c(I2cConfig {
///     speed: I2cSpeed::Khz400,
///     pullup: true,
/// })?;
/// let data = i2c.write_read(&[0xA0, 0x00], 64)?;
/// i2c.exit()?;
/// # Ok::<(), hydrabus::HydraBusError>(())
/// ```
pub struct I2c<'a, T: Transport> {
    session: &'a mut HydraBus<T>,
    config: I2cConfig,
}

const SCOPE: Scope = Scope::Bus(BusKind::I2c);

impl<'a, T: Transport> I2c<'a, T> {
    /// Bind I2C mode on the session and push the configuration
    pub(crate) fn bind(session: &'a mut HydraBus<T>, config: I2cConfig) -> Result<Self> {
        session.enter_mode(BusKind::I2c)?;
        let mut i2c = Self { session, config };
        i2c.apply_config()?;
        Ok(i2c)
    }

    /// The configuration currently applied
    pub fn config(&self) -> I2cConfig {
        self.config
    }

    fn apply_config(&mut self) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            I2C_CMD_CONFIG_BASE | self.config.config_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;

        let cmd = Command::new(
            SCOPE,
            I2C_CMD_SET_SPEED_BASE | self.config.speed.to_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Change the bus clock speed
    pub fn set_speed(&mut self, speed: I2cSpeed) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            I2C_CMD_SET_SPEED_BASE | speed.to_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        self.config.speed = speed;
        Ok(())
    }

    /// Set the clock-stretch timeout in clock periods (0 disables)
    pub fn set_clock_stretch(&mut self, clocks: u32) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            I2C_CMD_CLOCK_STRETCH,
            clocks.to_be_bytes().to_vec(),
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Issue a start condition
    pub fn start(&mut self) -> Result<()> {
        self.bus_primitive(I2C_CMD_START)
    }

    /// Issue a stop condition
    pub fn stop(&mut self) -> Result<()> {
        self.bus_primitive(I2C_CMD_STOP)
    }

    /// Acknowledge the last byte read
    pub fn send_ack(&mut self) -> Result<()> {
        self.bus_primitive(I2C_CMD_SEND_ACK)
    }

    /// Refuse the last byte read, ending a read sequence
    pub fn send_nack(&mut self) -> Result<()> {
        self.bus_primitive(I2C_CMD_SEND_NACK)
    }

    fn bus_primitive(&mut self, opcode: u8) -> Result<()> {
        let cmd = Command::new(SCOPE, opcode, vec![], ResponseShape::Status).non_idempotent();
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Clock one byte in without acknowledging it
    ///
    /// Follow with `send_ack` to continue reading or `send_nack` to end.
    pub fn read_byte(&mut self) -> Result<u8> {
        let cmd =
            Command::new(SCOPE, I2C_CMD_READ_BYTE, vec![], ResponseShape::Fixed(1)).non_idempotent();
        let payload = self.session.execute(&cmd)?;
        Ok(payload[0])
    }

    /// Read bytes, acknowledging all but the last
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Err(HydraBusError::InvalidParameter(
                "read needs at least one byte".into(),
            ));
        }
        let mut result = Vec::with_capacity(len);
        for _ in 0..len - 1 {
            result.push(self.read_byte()?);
            self.send_ack()?;
        }
        result.push(self.read_byte()?);
        self.send_nack()?;
        Ok(result)
    }

    /// Write up to 16 bytes, returning the slave's per-byte ACK flags
    ///
    /// The caller frames the transaction with `start`/`stop`. A returned
    /// `true` means the byte was acknowledged.
    pub fn bulk_write(&mut self, data: &[u8]) -> Result<Vec<bool>> {
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
            ResponseShape::StatusThen(data.len()),
        )
        .non_idempotent();
        let acks = self.session.execute(&cmd)?;
        // On the wire 0x00 means ACK
        Ok(acks.iter().map(|&b| b == 0x00).collect())
    }

    /// Write-then-read transaction
    ///
    /// The device sends a start condition before writing and a stop
    /// condition after reading.
    pub fn write_read(&mut self, data: &[u8], read_len: usize) -> Result<Vec<u8>> {
        if data.len() > u16::MAX as usize || read_len > u16::MAX as usize {
            return Err(HydraBusError::InvalidParameter(
                "transfer lengths must fit in 16 bits".into(),
            ));
        }

        let mut params = Vec::with_capacity(4 + data.len());
        params.extend_from_slice(&(data.len() as u16).to_be_bytes());
        params.extend_from_slice(&(read_len as u16).to_be_bytes());
        params.extend_from_slice(data);

        let cmd = Command::new(
            SCOPE,
            I2C_CMD_WRITE_READ,
            params,
            ResponseShape::StatusThen(read_len),
        )
        .non_idempotent();
        self.session.execute(&cmd)
    }

    /// Write bytes in one transaction, discarding the read phase
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.write_read(data, 0).map(|_| ())
    }

    /// Scan the bus and return every address that acknowledges
    ///
    /// Probes the 7-bit address range 0x01..0x77 with an empty write.
    pub fn scan(&mut self) -> Result<Vec<u8>> {
        let mut found = Vec::new();
        for addr in I2C_SCAN_FIRST..I2C_SCAN_LAST {
            self.start()?;
            let acks = self.bulk_write(&[addr << 1])?;
            self.stop()?;
            if acks[0] {
                found.push(addr);
            }
        }
        Ok(found)
    }

    /// Exit I2C mode back to the binary bridge
    pub fn exit(self) -> Result<()> {
        self.session.exit_mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn i2c_session(mock: &MockTransport) -> HydraBus<MockTransport> {
        let mut hb = HydraBus::new(mock.clone());
        hb.connect().unwrap();
        mock.push_response(b"BBIO1");
        hb.enter_binary().unwrap();
        mock.push_response(b"I2C1");
        mock.push_response(&[STATUS_OK]); // config
        mock.push_response(&[STATUS_OK]); // speed
        hb
    }

    #[test]
    fn test_bulk_write_translates_ack_flags() {
        let mock = MockTransport::new();
        let mut hb = i2c_session(&mock);
        let mut i2c = hb.i2c(I2cConfig::default()).unwrap();

        // Slave acks the first byte, refuses the second
        mock.push_response(&[STATUS_OK, 0x00, 0x01]);
        let acks = i2c.bulk_write(&[0xA0, 0x00]).unwrap();
        assert_eq!(acks, vec![true, false]);

        let writes = mock.writes();
        assert_eq!(writes[writes.len() - 1], vec![0b0001_0001, 0xA0, 0x00]);
    }

    #[test]
    fn test_read_acks_all_but_last() {
        let mock = MockTransport::new();
        let mut hb = i2c_session(&mock);
        let mut i2c = hb.i2c(I2cConfig::default()).unwrap();

        mock.push_response(&[0x11]); // byte 1
        mock.push_response(&[STATUS_OK]); // ack
        mock.push_response(&[0x22]); // byte 2
        mock.push_response(&[STATUS_OK]); // nack
        let data = i2c.read(2).unwrap();
        assert_eq!(data, vec![0x11, 0x22]);

        let writes = mock.writes();
        let n = writes.len();
        assert_eq!(writes[n - 4], vec![I2C_CMD_READ_BYTE]);
        assert_eq!(writes[n - 3], vec![I2C_CMD_SEND_ACK]);
        assert_eq!(writes[n - 2], vec![I2C_CMD_READ_BYTE]);
        assert_eq!(writes[n - 1], vec![I2C_CMD_SEND_NACK]);
    }

    #[test]
    fn test_write_read_layout() {
        let mock = MockTransport::new();
        let mut hb = i2c_session(&mock);
        let mut i2c = hb.i2c(I2cConfig::default()).unwrap();

        mock.push_response(&[STATUS_OK, 0xAB]);
        let data = i2c.write_read(&[0xA1], 1).unwrap();
        assert_eq!(data, vec![0xAB]);

        let writes = mock.writes();
        assert_eq!(
            writes[writes.len() - 1],
            vec![I2C_CMD_WRITE_READ, 0x00, 0x01, 0x00, 0x01, 0xA1]
        );
    }

    #[test]
    fn test_write_read_nack_surfaces() {
        let mock = MockTransport::new();
        let mut hb = i2c_session(&mock);
        let mut i2c = hb.i2c(I2cConfig::default()).unwrap();

        mock.push_response(&[STATUS_ERROR]);
        let err = i2c.write_read(&[0xA1], 4).unwrap_err();
        assert!(matches!(
            err,
            HydraBusError::Nack {
                opcode: I2C_CMD_WRITE_READ
            }
        ));
    }

    #[test]
    fn test_clock_stretch_params() {
        let mock = MockTransport::new();
        let mut hb = i2c_session(&mock);
        let mut i2c = hb.i2c(I2cConfig::default()).unwrap();

        mock.push_response(&[STATUS_OK]);
        i2c.set_clock_stretch(0x0001_0000).unwrap();
        let writes = mock.writes();
        assert_eq!(
            writes[writes.len() - 1],
            vec![I2C_CMD_CLOCK_STRETCH, 0x00, 0x01, 0x00, 0x00]
        );
    }
}
