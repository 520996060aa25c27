//! CAN bus driver
//!
//! Classic CAN only: 11/29-bit identifiers and up to 8 data bytes. RX
//! frames come back in a fixed 13-byte wire layout (u32 ID + DLC + 8 data
//! bytes, zero padded) so the response length never depends on the frame.

use crate::config::{CanBitrate, CanConfig};
use crate::constants::*;
use crate::device::HydraBus;
use crate::error::{HydraBusError, Result};
use crate::frame::{Command, ResponseShape, Scope};
use crate::mode::BusKind;
use crate::transport::Transport;

/// Extended frame format flag (29-bit ID)
pub const CAN_EFF_FLAG: u32 = 0x8000_0000;
/// Standard frame format mask (11-bit ID)
pub const CAN_SFF_MASK: u32 = 0x0000_07FF;
/// Extended frame format mask (29-bit ID)
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

/// One classic CAN frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    /// CAN identifier (with `CAN_EFF_FLAG` set for extended IDs)
    pub id: u32,
    /// Data length code (0..=8)
    pub dlc: u8,
    /// Frame data, valid up to `dlc`
    pub data: [u8; CAN_MAX_DLEN],
}

impl CanFrame {
    /// Create a frame with the given identifier and data
    ///
    /// Fails if `data` exceeds the classic CAN payload.
    pub fn with_data(id: u32, data: &[u8]) -> Result<Self> {
        if data.len() > CAN_MAX_DLEN {
            return Err(HydraBusError::InvalidParameter(format!(
                "classic CAN carries at most {} bytes, got {}",
                CAN_MAX_DLEN,
                data.len()
            )));
        }
        let mut buf = [0u8; CAN_MAX_DLEN];
        buf[..data.len()].copy_from_slice(data);
        Ok(Self {
            id,
            dlc: data.len() as u8,
            data: buf,
        })
    }

    /// The arbitration ID without flag bits
    pub fn arbitration_id(&self) -> u32 {
        if self.is_extended_id() {
            self.id & CAN_EFF_MASK
        } else {
            self.id & CAN_SFF_MASK
        }
    }

    /// Check if this is an extended ID frame (29-bit)
    pub fn is_extended_id(&self) -> bool {
        (self.id & CAN_EFF_FLAG) != 0
    }

    /// Frame data as a slice, trimmed to the DLC
    pub fn data(&self) -> &[u8] {
        &self.data[..(self.dlc as usize).min(CAN_MAX_DLEN)]
    }

    /// Unpack from the device's fixed RX wire layout
    fn from_wire(raw: &[u8]) -> Result<Self> {
        if raw.len() != CAN_WIRE_FRAME_LEN {
            return Err(HydraBusError::ProtocolDesync("short CAN frame payload"));
        }
        let dlc = raw[4].min(CAN_MAX_DLEN as u8);
        let mut data = [0u8; CAN_MAX_DLEN];
        data.copy_from_slice(&raw[5..5 + CAN_MAX_DLEN]);
        Ok(Self {
            id: u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
            dlc,
            data,
        })
    }
}

impl std::fmt::Display for CanFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data_str = self
            .data()
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{:>8X}   [{}]  {}", self.arbitration_id(), self.dlc, data_str)
    }
}

/// CAN interface bound to a session
pub struct Can<'a, T: Transport> {
    session: &'a mut HydraBus<T>,
    config: CanConfig,
}

const SCOPE: Scope = Scope::Bus(BusKind::Can);

impl<'a, T: Transport> Can<'a, T> {
    /// Bind CAN mode on the session and push the configuration
    pub(crate) fn bind(session: &'a mut HydraBus<T>, config: CanConfig) -> Result<Self> {
        session.enter_mode(BusKind::Can)?;
        let mut can = Self { session, config };
        can.apply_config()?;
        Ok(can)
    }

    /// The configuration currently applied
    pub fn config(&self) -> CanConfig {
        self.config
    }

    fn apply_config(&mut self) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            CAN_CMD_SET_SPEED_BASE | self.config.bitrate.to_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Change the nominal bitrate
    pub fn set_bitrate(&mut self, bitrate: CanBitrate) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            CAN_CMD_SET_SPEED_BASE | bitrate.to_bits(),
            vec![],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        self.config.bitrate = bitrate;
        Ok(())
    }

    /// Set the acceptance filter to the inclusive ID range [low, high]
    pub fn set_filter(&mut self, low: u32, high: u32) -> Result<()> {
        if low > high {
            return Err(HydraBusError::InvalidParameter(format!(
                "filter range is inverted ({:#X} > {:#X})",
                low, high
            )));
        }
        let mut params = Vec::with_capacity(8);
        params.extend_from_slice(&low.to_be_bytes());
        params.extend_from_slice(&high.to_be_bytes());
        let cmd = Command::new(SCOPE, CAN_CMD_SET_FILTER, params, ResponseShape::Status);
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Transmit one frame
    pub fn write(&mut self, frame: &CanFrame) -> Result<()> {
        if frame.dlc as usize > CAN_MAX_DLEN {
            return Err(HydraBusError::InvalidParameter(format!(
                "DLC {} exceeds classic CAN", frame.dlc
            )));
        }
        let mut params = Vec::with_capacity(5 + frame.dlc as usize);
        params.extend_from_slice(&frame.id.to_be_bytes());
        params.push(frame.dlc);
        params.extend_from_slice(frame.data());

        let cmd =
            Command::new(SCOPE, CAN_CMD_WRITE, params, ResponseShape::Status).non_idempotent();
        self.session.execute(&cmd)?;
        Ok(())
    }

    /// Receive one frame from the bus
    ///
    /// Blocks until a frame arrives or the session timeout elapses.
    pub fn read(&mut self) -> Result<CanFrame> {
        let cmd = Command::new(
            SCOPE,
            CAN_CMD_READ,
            vec![],
            ResponseShape::StatusThen(CAN_WIRE_FRAME_LEN),
        )
        .non_idempotent();
        let payload = self.session.execute(&cmd)?;
        CanFrame::from_wire(&payload)
    }

    /// Exit CAN mode back to the binary bridge
    pub fn exit(self) -> Result<()> {
        self.session.exit_mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn can_session(mock: &MockTransport) -> HydraBus<MockTransport> {
        let mut hb = HydraBus::new(mock.clone());
        hb.connect().unwrap();
        mock.push_response(b"BBIO1");
        hb.enter_binary().unwrap();
        mock.push_response(b"CAN1");
        mock.push_response(&[STATUS_OK]); // bitrate
        hb
    }

    #[test]
    fn test_frame_data_is_trimmed_to_dlc() {
        let frame = CanFrame::with_data(0x123, &[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(frame.dlc, 3);
        assert_eq!(frame.data(), &[0x01, 0x02, 0x03]);
        assert!(!frame.is_extended_id());
        assert_eq!(frame.arbitration_id(), 0x123);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        assert!(matches!(
            CanFrame::with_data(0x123, &[0u8; 9]),
            Err(HydraBusError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_write_layout() {
        let mock = MockTransport::new();
        let mut hb = can_session(&mock);
        let mut can = hb.can(CanConfig::default()).unwrap();

        let frame = CanFrame::with_data(0x7FF, &[0xAA, 0xBB]).unwrap();
        mock.push_response(&[STATUS_OK]);
        can.write(&frame).unwrap();

        let writes = mock.writes();
        assert_eq!(
            writes[writes.len() - 1],
            vec![CAN_CMD_WRITE, 0x00, 0x00, 0x07, 0xFF, 0x02, 0xAA, 0xBB]
        );
    }

    #[test]
    fn test_read_unpacks_wire_frame() {
        let mock = MockTransport::new();
        let mut hb = can_session(&mock);
        let mut can = hb.can(CanConfig::default()).unwrap();

        let mut wire = vec![STATUS_OK, 0x00, 0x00, 0x01, 0x23, 0x02];
        wire.extend_from_slice(&[0xDE, 0xAD, 0, 0, 0, 0, 0, 0]);
        mock.push_response(&wire);
        let frame = can.read().unwrap();
        assert_eq!(frame.arbitration_id(), 0x123);
        assert_eq!(frame.data(), &[0xDE, 0xAD]);
    }

    #[test]
    fn test_inverted_filter_rejected_locally() {
        let mock = MockTransport::new();
        let mut hb = can_session(&mock);
        let mut can = hb.can(CanConfig::default()).unwrap();
        let writes_before = mock.writes().len();

        assert!(matches!(
            can.set_filter(0x700, 0x100),
            Err(HydraBusError::InvalidParameter(_))
        ));
        assert_eq!(mock.writes().len(), writes_before);
    }
}
