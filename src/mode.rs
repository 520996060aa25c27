//! Session modes and sub-mode descriptors
//!
//! The device-side mode (text console, binary bridge, or a bound bus
//! sub-mode) is modeled as an explicit state machine on the host; the
//! descriptor table carries the per-sub-mode entry bytes and identification
//! signatures used to drive and verify transitions.

use crate::constants::{
    MODE_SELECT_CAN, MODE_SELECT_GPIO, MODE_SELECT_I2C, MODE_SELECT_MMC, MODE_SELECT_ONEWIRE,
    MODE_SELECT_SPI, MODE_SELECT_UART,
};

/// Bus sub-modes available inside the binary bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusKind {
    /// SPI master
    Spi,
    /// I2C master
    I2c,
    /// UART bridge
    Uart,
    /// 1-Wire master
    OneWire,
    /// CAN interface
    Can,
    /// GPIO pin access
    Gpio,
    /// eMMC block access
    Mmc,
}

impl BusKind {
    /// Human-readable sub-mode name
    pub fn name(&self) -> &'static str {
        match self {
            BusKind::Spi => "SPI",
            BusKind::I2c => "I2C",
            BusKind::Uart => "UART",
            BusKind::OneWire => "1-Wire",
            BusKind::Can => "CAN",
            BusKind::Gpio => "GPIO",
            BusKind::Mmc => "MMC",
        }
    }
}

impl std::fmt::Display for BusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Session mode as last confirmed by the device
///
/// The session never advances this optimistically: after any failure the
/// value still reflects the last state the device acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No transport attached
    Disconnected,
    /// Device is in its human-readable text console
    Console,
    /// Device parses compact binary opcodes
    BinaryBridge,
    /// A bus sub-mode is bound
    Bound(BusKind),
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Disconnected => f.write_str("disconnected"),
            Mode::Console => f.write_str("console mode"),
            Mode::BinaryBridge => f.write_str("binary bridge mode"),
            Mode::Bound(kind) => write!(f, "{} mode", kind),
        }
    }
}

/// Static description of one sub-mode's handshake
///
/// Constructed once; shared by reference across drivers.
#[derive(Debug)]
pub struct ModeDescriptor {
    /// Sub-mode this entry describes
    pub kind: BusKind,
    /// Byte written in the binary bridge to select the sub-mode
    pub select: u8,
    /// Identification signature the device answers with; the final byte is
    /// the sub-mode protocol version
    pub signature: &'static [u8; 4],
}

impl ModeDescriptor {
    /// Protocol version byte the device is expected to report
    pub fn version(&self) -> u8 {
        self.signature[3]
    }
}

/// Descriptor table for all supported sub-modes
pub const MODE_TABLE: &[ModeDescriptor] = &[
    ModeDescriptor {
        kind: BusKind::Spi,
        select: MODE_SELECT_SPI,
        signature: b"SPI1",
    },
    ModeDescriptor {
        kind: BusKind::I2c,
        select: MODE_SELECT_I2C,
        signature: b"I2C1",
    },
    ModeDescriptor {
        kind: BusKind::Uart,
        select: MODE_SELECT_UART,
        signature: b"ART1",
    },
    ModeDescriptor {
        kind: BusKind::OneWire,
        select: MODE_SELECT_ONEWIRE,
        signature: b"1W01",
    },
    ModeDescriptor {
        kind: BusKind::Can,
        select: MODE_SELECT_CAN,
        signature: b"CAN1",
    },
    ModeDescriptor {
        kind: BusKind::Gpio,
        select: MODE_SELECT_GPIO,
        signature: b"PIN1",
    },
    ModeDescriptor {
        kind: BusKind::Mmc,
        select: MODE_SELECT_MMC,
        signature: b"MMC1",
    },
];

/// Look up the descriptor for a sub-mode
pub fn descriptor(kind: BusKind) -> &'static ModeDescriptor {
    MODE_TABLE
        .iter()
        .find(|d| d.kind == kind)
        .expect("every BusKind has a descriptor")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_descriptor() {
        for kind in [
            BusKind::Spi,
            BusKind::I2c,
            BusKind::Uart,
            BusKind::OneWire,
            BusKind::Can,
            BusKind::Gpio,
            BusKind::Mmc,
        ] {
            let desc = descriptor(kind);
            assert_eq!(desc.kind, kind);
            assert_eq!(desc.signature.len(), 4);
        }
    }

    #[test]
    fn test_select_bytes_are_unique() {
        for (i, a) in MODE_TABLE.iter().enumerate() {
            for b in &MODE_TABLE[i + 1..] {
                assert_ne!(a.select, b.select);
                assert_ne!(a.signature, b.signature);
            }
        }
    }

    #[test]
    fn test_version_is_signature_tail() {
        assert_eq!(descriptor(BusKind::Spi).version(), b'1');
        assert_eq!(descriptor(BusKind::OneWire).version(), b'1');
    }
}
