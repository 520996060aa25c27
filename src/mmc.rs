//! eMMC driver
//!
//! Register reads (CID, CSD, extended CSD) and 512-byte block access. A
//! block write that times out is reported as unconfirmed rather than
//! retried, since the card may have committed it.

use crate::config::MmcConfig;
use crate::constants::*;
use crate::device::HydraBus;
use crate::error::{HydraBusError, Result};
use crate::frame::{Command, ResponseShape, Scope};
use crate::mode::BusKind;
use crate::transport::Transport;

/// eMMC interface bound to a session
pub struct Mmc<'a, T: Transport> {
    session: &'a mut HydraBus<T>,
    config: MmcConfig,
}

const SCOPE: Scope = Scope::Bus(BusKind::Mmc);

impl<'a, T: Transport> Mmc<'a, T> {
    /// Bind MMC mode on the session and push the configuration
    pub(crate) fn bind(session: &'a mut HydraBus<T>, config: MmcConfig) -> Result<Self> {
        session.enter_mode(BusKind::Mmc)?;
        let mut mmc = Self { session, config };
        mmc.apply_config()?;
        Ok(mmc)
    }

    /// The configuration currently applied
    pub fn config(&self) -> MmcConfig {
        self.config
    }

    fn apply_config(&mut self) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            MMC_CMD_CONFIG_BASE | self.config.config_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Read the card identification register
    pub fn cid(&mut self) -> Result<Vec<u8>> {
        self.read_register(MMC_CMD_CID)
    }

    /// Read the card-specific data register
    pub fn csd(&mut self) -> Result<Vec<u8>> {
        self.read_register(MMC_CMD_CSD)
    }

    fn read_register(&mut self, opcode: u8) -> Result<Vec<u8>> {
        let cmd = Command::new(
            SCOPE,
            opcode,
            vec![],
            ResponseShape::StatusThen(MMC_REGISTER_LEN),
        );
        self.session.execute(&cmd)
    }

    /// Read the extended CSD register (512 bytes)
    pub fn ext_csd(&mut self) -> Result<Vec<u8>> {
        let cmd = Command::new(
            SCOPE,
            MMC_CMD_EXT_CSD,
            vec![],
            ResponseShape::StatusThen(MMC_BLOCK_LEN),
        );
        self.session.execute(&cmd)
    }

    /// Read one 512-byte block
    pub fn read_block(&mut self, block: u32) -> Result<Vec<u8>> {
        let cmd = Command::new(
            SCOPE,
            MMC_CMD_READ_BLOCK,
            block.to_be_bytes().to_vec(),
            ResponseShape::StatusThen(MMC_BLOCK_LEN),
        );
        self.session.execute(&cmd)
    }

    /// Write one 512-byte block
    ///
    /// An unconfirmed outcome surfaces as `TransactionFailed`; the block
    /// may or may not have been committed.
    pub fn write_block(&mut self, block: u32, data: &[u8]) -> Result<()> {
        if data.len() != MMC_BLOCK_LEN {
            return Err(HydraBusError::InvalidParameter(format!(
                "block writes are exactly {} bytes, got {}",
                MMC_BLOCK_LEN,
                data.len()
            )));
        }
        let mut params = Vec::with_capacity(4 + MMC_BLOCK_LEN);
        params.extend_from_slice(&block.to_be_bytes());
        params.extend_from_slice(data);

        let cmd =
            Command::new(SCOPE, MMC_CMD_WRITE_BLOCK, params, ResponseShape::Status).non_idempotent();
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Exit MMC mode back to the binary bridge
    pub fn exit(self) -> Result<()> {
        self.session.exit_mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn mmc_session(mock: &MockTransport) -> HydraBus<MockTransport> {
        let mut hb = HydraBus::new(mock.clone());
        hb.connect().unwrap();
        mock.push_response(b"BBIO1");
        hb.enter_binary().unwrap();
        mock.push_response(b"MMC1");
        mock.push_response(&[STATUS_OK]); // config
        hb
    }

    #[test]
    fn test_register_reads() {
        let mock = MockTransport::new();
        let mut hb = mmc_session(&mock);
        let mut mmc = hb.mmc(MmcConfig::default()).unwrap();

        let mut resp = vec![STATUS_OK];
        resp.extend_from_slice(&[0x45; MMC_REGISTER_LEN]);
        mock.push_response(&resp);
        let cid = mmc.cid().unwrap();
        assert_eq!(cid.len(), MMC_REGISTER_LEN);

        let writes = mock.writes();
        assert_eq!(writes[writes.len() - 1], vec![MMC_CMD_CID]);
    }

    #[test]
    fn test_block_write_length_validated() {
        let mock = MockTransport::new();
        let mut hb = mmc_session(&mock);
        let mut mmc = hb.mmc(MmcConfig::default()).unwrap();
        let writes_before = mock.writes().len();

        assert!(matches!(
            mmc.write_block(0, &[0u8; 100]),
            Err(HydraBusError::InvalidParameter(_))
        ));
        assert_eq!(mock.writes().len(), writes_before);
    }

    #[test]
    fn test_block_write_timeout_is_unconfirmed() {
        let mock = MockTransport::new();
        let mut hb = mmc_session(&mock);
        let mut mmc = hb.mmc(MmcConfig::default()).unwrap();

        // No response: a block write is never re-sent
        let writes_before = mock.writes().len();
        let err = mmc.write_block(7, &[0xAB; MMC_BLOCK_LEN]).unwrap_err();
        assert!(matches!(
            err,
            HydraBusError::TransactionFailed {
                opcode: MMC_CMD_WRITE_BLOCK
            }
        ));
        assert_eq!(mock.writes().len(), writes_before + 1);
    }

    #[test]
    fn test_read_block_params() {
        let mock = MockTransport::new();
        let mut hb = mmc_session(&mock);
        let mut mmc = hb.mmc(MmcConfig::default()).unwrap();

        let mut resp = vec![STATUS_OK];
        resp.extend_from_slice(&[0u8; MMC_BLOCK_LEN]);
        mock.push_response(&resp);
        mmc.read_block(0x0102).unwrap();

        let writes = mock.writes();
        assert_eq!(
            writes[writes.len() - 1],
            vec![MMC_CMD_READ_BLOCK, 0x00, 0x00, 0x01, 0x02]
        );
    }
}
