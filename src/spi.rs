//! SPI bus driver
//!
//! Thin policy layer over the command dispatcher: validates parameters
//! against the SPI mode's legal ranges, builds the mode's commands, and
//! translates payloads back into bus-level results.

use crate::config::{SpiConfig, SpiSpeed};
use crate::constants::*;
use crate::device::HydraBus;
use crate::error::{HydraBusError, Result};
use crate::frame::{Command, ResponseShape, Scope};
use crate::mode::BusKind;
use crate::transport::Transport;

/// SPI master bound to a session
///
/// # Example
///
/// ```no_run
/// use hydrabus::{HydraBus, SpiConfig, SpiSpeed};
///
/// let mut hb = HydraBus::open("/dev/ttyACM0")?;
/// hb.enter_binary()?;
///
/// let mut spi = hb.spi(SpiConfig {
///     speed: SpiSpeed::Mhz10,
///     ..Default::default()
/// })?;
/// let id = spi.write_read(&[0x9F], 3)?;
/// spi.exit()?;
/// # Ok::<(), hydrabus::HydraBusError>(())
/// ```
pub struct Spi<'a, T: Transport> {
    session: &'a mut HydraBus<T>,
    config: SpiConfig,
}

const SCOPE: Scope = Scope::Bus(BusKind::Spi);

impl<'a, T: Transport> Spi<'a, T> {
    /// Bind SPI mode on the session and push the configuration
    pub(crate) fn bind(session: &'a mut HydraBus<T>, config: SpiConfig) -> Result<Self> {
        // Validate before touching the device
        config.speed_bits()?;
        session.enter_mode(BusKind::Spi)?;
        let mut spi = Self { session, config };
        spi.apply_config()?;
        Ok(spi)
    }

    /// The configuration currently applied
    pub fn config(&self) -> SpiConfig {
        self.config
    }

    fn apply_config(&mut self) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            SPI_CMD_CONFIG_BASE | self.config.config_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;

        let cmd = Command::new(
            SCOPE,
            SPI_CMD_SET_SPEED_BASE | self.config.speed_bits()?,
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Change the bus clock speed
    ///
    /// Completes (device Ack) before any transfer using the new clock can
    /// be issued.
    pub fn set_speed(&mut self, speed: SpiSpeed) -> Result<()> {
        let bits = speed.to_bits(self.config.device).ok_or_else(|| {
            HydraBusError::InvalidParameter(format!(
                "{:?} is not available on {:?}",
                speed, self.config.device
            ))
        })?;
        let cmd = Command::new(
            SCOPE,
            SPI_CMD_SET_SPEED_BASE | bits,
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        self.config.speed = speed;
        Ok(())
    }

    /// Drive the chip-select line (false = low/asserted, true = high)
    pub fn set_chip_select(&mut self, level: bool) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            SPI_CMD_CS_BASE | level as u8,
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Full-duplex transfer of up to 16 bytes
    ///
    /// Returns the bytes clocked in while `data` was clocked out. Chip
    /// select is not touched; pair with `set_chip_select` or use
    /// `write_read` for managed CS.
    pub fn transfer(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        check_bulk_len(data.len())?;
        let cmd = Command::new(
            SCOPE,
            CMD_BULK_BASE | (data.len() - 1) as u8,
            data.to_vec(),
            ResponseShape::StatusThen(data.len()),
        )
        .non_idempotent();
        self.session.execute(&cmd)
    }

    /// Write-then-read with automatic chip-select handling
    ///
    /// The device asserts CS, clocks `data` out, clocks `read_len` bytes
    /// in, and releases CS, all in one transaction.
    pub fn write_read(&mut self, data: &[u8], read_len: usize) -> Result<Vec<u8>> {
        self.write_read_cs(data, read_len, true)
    }

    /// Write-then-read, optionally leaving chip-select alone
    pub fn write_read_cs(&mut self, data: &[u8], read_len: usize, drive_cs: bool) -> Result<Vec<u8>> {
        check_u16_len("write length", data.len())?;
        check_u16_len("read length", read_len)?;

        let mut params = Vec::with_capacity(4 + data.len());
        params.extend_from_slice(&(data.len() as u16).to_be_bytes());
        params.extend_from_slice(&(read_len as u16).to_be_bytes());
        params.extend_from_slice(data);

        let cmd = Command::new(
            SCOPE,
            SPI_CMD_WRITE_READ_BASE | (!drive_cs) as u8,
            params,
            ResponseShape::StatusThen(read_len),
        )
        .non_idempotent();
        self.session.execute(&cmd)
    }

    /// Write bytes to the bus, discarding anything clocked in
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.write_read(data, 0).map(|_| ())
    }

    /// Read bytes from the bus, clocking out zeroes
    pub fn read(&mut self, read_len: usize) -> Result<Vec<u8>> {
        self.write_read(&[], read_len)
    }

    /// Exit SPI mode back to the binary bridge
    pub fn exit(self) -> Result<()> {
        self.session.exit_mode()
    }
}

fn check_bulk_len(len: usize) -> Result<()> {
    if len == 0 {
        return Err(HydraBusError::InvalidParameter(
            "bulk transfer needs at least one byte".into(),
        ));
    }
    if len > BULK_MAX_LEN {
        return Err(HydraBusError::InvalidParameter(format!(
            "bulk transfer limited to {} bytes, got {}",
            BULK_MAX_LEN, len
        )));
    }
    Ok(())
}

fn check_u16_len(what: &str, len: usize) -> Result<()> {
    if len > u16::MAX as usize {
        return Err(HydraBusError::InvalidParameter(format!(
            "{} must fit in 16 bits, got {}",
            what, len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STATUS_OK;
    use crate::transport::mock::MockTransport;

    fn spi_session(mock: &MockTransport) -> HydraBus<MockTransport> {
        let mut hb = HydraBus::new(mock.clone());
        hb.connect().unwrap();
        mock.push_response(b"BBIO1");
        hb.enter_binary().unwrap();
        hb
    }

    #[test]
    fn test_bind_sends_config_then_speed() {
        let mock = MockTransport::new();
        let mut hb = spi_session(&mock);
        mock.push_response(b"SPI1");
        mock.push_response(&[STATUS_OK]);
        mock.push_response(&[STATUS_OK]);
        hb.spi(SpiConfig::default()).unwrap();

        let writes = mock.writes();
        let n = writes.len();
        // config (0b1000_0010 for the default) precedes speed (1 MHz)
        assert_eq!(writes[n - 2], vec![0b1000_0010]);
        assert_eq!(writes[n - 1], vec![0b0110_0010]);
        hb.disconnect().unwrap();
    }

    #[test]
    fn test_transfer_length_validation() {
        let mock = MockTransport::new();
        let mut hb = spi_session(&mock);
        mock.push_response(b"SPI1");
        mock.push_response(&[STATUS_OK]);
        mock.push_response(&[STATUS_OK]);
        let mut spi = hb.spi(SpiConfig::default()).unwrap();
        let writes_before = mock.writes().len();

        assert!(matches!(
            spi.transfer(&[]),
            Err(HydraBusError::InvalidParameter(_))
        ));
        assert!(matches!(
            spi.transfer(&[0u8; 17]),
            Err(HydraBusError::InvalidParameter(_))
        ));
        // Validation failures never reach the transport
        assert_eq!(mock.writes().len(), writes_before);
    }

    #[test]
    fn test_write_read_frame_layout() {
        let mock = MockTransport::new();
        let mut hb = spi_session(&mock);
        mock.push_response(b"SPI1");
        mock.push_response(&[STATUS_OK]);
        mock.push_response(&[STATUS_OK]);
        let mut spi = hb.spi(SpiConfig::default()).unwrap();

        mock.push_response(&[STATUS_OK, 0xC2, 0x20, 0x18]);
        let id = spi.write_read(&[0x9F], 3).unwrap();
        assert_eq!(id, vec![0xC2, 0x20, 0x18]);

        let writes = mock.writes();
        // opcode 0x04 (managed CS), wlen=1, rlen=3, then the write data
        assert_eq!(
            writes[writes.len() - 1],
            vec![0x04, 0x00, 0x01, 0x00, 0x03, 0x9F]
        );
    }

    #[test]
    fn test_chip_select_levels() {
        let mock = MockTransport::new();
        let mut hb = spi_session(&mock);
        mock.push_response(b"SPI1");
        mock.push_response(&[STATUS_OK]);
        mock.push_response(&[STATUS_OK]);
        let mut spi = hb.spi(SpiConfig::default()).unwrap();

        mock.push_response(&[STATUS_OK]);
        spi.set_chip_select(false).unwrap();
        mock.push_response(&[STATUS_OK]);
        spi.set_chip_select(true).unwrap();

        let writes = mock.writes();
        let n = writes.len();
        assert_eq!(writes[n - 2], vec![0b0000_0010]);
        assert_eq!(writes[n - 1], vec![0b0000_0011]);
    }
}
