//! Sub-mode configuration structures
//!
//! Each sub-mode takes a small typed configuration that is validated on the
//! host and encoded into the device's speed and config commands. The legal
//! value sets mirror what the firmware accepts; anything outside them is
//! rejected locally before a byte is written.

use crate::error::{HydraBusError, Result};

// ============================================================================
// SPI
// ============================================================================

/// SPI peripheral selection
///
/// The device exposes two SPI masters with different speed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiDevice {
    /// SPI1 (fast peripheral, up to 42 MHz)
    #[default]
    Spi1,
    /// SPI2 (up to 21 MHz)
    Spi2,
}

impl SpiDevice {
    /// Device select bit of the SPI config command
    pub fn to_bit(self) -> u8 {
        match self {
            SpiDevice::Spi1 => 0,
            SpiDevice::Spi2 => 1,
        }
    }
}

/// SPI clock speed
///
/// Not every speed exists on both peripherals; `to_bits` reports the
/// unsupported combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiSpeed {
    /// 160 kHz (SPI2 only)
    Khz160,
    /// 320 kHz
    Khz320,
    /// 650 kHz
    Khz650,
    /// 1 MHz
    Mhz1,
    /// 2 MHz
    Mhz2,
    /// 5 MHz
    Mhz5,
    /// 10 MHz
    Mhz10,
    /// 21 MHz
    Mhz21,
    /// 42 MHz (SPI1 only)
    Mhz42,
}

impl SpiSpeed {
    /// Encode the speed for the given peripheral's table
    ///
    /// Returns `None` if the peripheral cannot generate this clock.
    pub fn to_bits(self, device: SpiDevice) -> Option<u8> {
        match device {
            SpiDevice::Spi1 => match self {
                SpiSpeed::Khz160 => None,
                SpiSpeed::Khz320 => Some(0b000),
                SpiSpeed::Khz650 => Some(0b001),
                SpiSpeed::Mhz1 => Some(0b010),
                SpiSpeed::Mhz2 => Some(0b011),
                SpiSpeed::Mhz5 => Some(0b100),
                SpiSpeed::Mhz10 => Some(0b101),
                SpiSpeed::Mhz21 => Some(0b110),
                SpiSpeed::Mhz42 => Some(0b111),
            },
            SpiDevice::Spi2 => match self {
                SpiSpeed::Khz160 => Some(0b000),
                SpiSpeed::Khz320 => Some(0b001),
                SpiSpeed::Khz650 => Some(0b010),
                SpiSpeed::Mhz1 => Some(0b011),
                SpiSpeed::Mhz2 => Some(0b100),
                SpiSpeed::Mhz5 => Some(0b101),
                SpiSpeed::Mhz10 => Some(0b110),
                SpiSpeed::Mhz21 => Some(0b111),
                SpiSpeed::Mhz42 => None,
            },
        }
    }
}

/// SPI sub-mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    /// Which SPI peripheral to use
    pub device: SpiDevice,
    /// Clock polarity (idle level)
    pub polarity: bool,
    /// Clock phase (sample on second edge when set)
    pub phase: bool,
    /// Bus clock speed
    pub speed: SpiSpeed,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            device: SpiDevice::Spi1,
            polarity: false,
            phase: true,
            speed: SpiSpeed::Mhz1,
        }
    }
}

impl SpiConfig {
    /// Low three bits of the SPI config command
    pub fn config_bits(&self) -> u8 {
        ((self.polarity as u8) << 2) | ((self.phase as u8) << 1) | self.device.to_bit()
    }

    /// Encode the speed, rejecting device/speed combinations the hardware
    /// cannot generate
    pub fn speed_bits(&self) -> Result<u8> {
        self.speed.to_bits(self.device).ok_or_else(|| {
            HydraBusError::InvalidParameter(format!(
                "{:?} is not available on {:?}",
                self.speed, self.device
            ))
        })
    }
}

// ============================================================================
// I2C
// ============================================================================

/// I2C bus speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum I2cSpeed {
    /// 50 kHz
    Khz50,
    /// 100 kHz (standard mode)
    #[default]
    Khz100,
    /// 400 kHz (fast mode)
    Khz400,
    /// 1 MHz (fast mode plus)
    Mhz1,
}

impl I2cSpeed {
    /// Low two bits of the I2C speed command
    pub fn to_bits(self) -> u8 {
        match self {
            I2cSpeed::Khz50 => 0b00,
            I2cSpeed::Khz100 => 0b01,
            I2cSpeed::Khz400 => 0b10,
            I2cSpeed::Mhz1 => 0b11,
        }
    }
}

/// I2C sub-mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct I2cConfig {
    /// Bus clock speed
    pub speed: I2cSpeed,
    /// Enable the internal pullups
    pub pullup: bool,
}

impl I2cConfig {
    /// Low three bits of the I2C config command
    pub fn config_bits(&self) -> u8 {
        (self.pullup as u8) << 2
    }
}

// ============================================================================
// UART
// ============================================================================

/// UART baud rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UartBaud {
    /// 300 baud
    B300,
    /// 1200 baud
    B1200,
    /// 2400 baud
    B2400,
    /// 4800 baud
    B4800,
    /// 9600 baud
    B9600,
    /// 19200 baud
    B19200,
    /// 38400 baud
    B38400,
    /// 57600 baud
    B57600,
    /// 115200 baud
    #[default]
    B115200,
    /// 230400 baud
    B230400,
    /// 460800 baud
    B460800,
    /// 921600 baud
    B921600,
    /// 1 Mbaud
    B1M,
}

impl UartBaud {
    /// Low four bits of the UART speed command
    pub fn to_bits(self) -> u8 {
        match self {
            UartBaud::B300 => 0b0000,
            UartBaud::B1200 => 0b0001,
            UartBaud::B2400 => 0b0010,
            UartBaud::B4800 => 0b0011,
            UartBaud::B9600 => 0b0100,
            UartBaud::B19200 => 0b0101,
            UartBaud::B38400 => 0b0110,
            UartBaud::B57600 => 0b0111,
            UartBaud::B115200 => 0b1000,
            UartBaud::B230400 => 0b1001,
            UartBaud::B460800 => 0b1010,
            UartBaud::B921600 => 0b1011,
            UartBaud::B1M => 0b1100,
        }
    }
}

/// UART parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UartParity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

impl UartParity {
    fn to_bits(self) -> u8 {
        match self {
            UartParity::None => 0b00,
            UartParity::Even => 0b01,
            UartParity::Odd => 0b10,
        }
    }
}

/// UART stop bit count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UartStopBits {
    /// One stop bit
    #[default]
    One,
    /// Two stop bits
    Two,
}

/// UART sub-mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UartConfig {
    /// Line baud rate
    pub baud: UartBaud,
    /// Parity setting
    pub parity: UartParity,
    /// Stop bit count
    pub stop_bits: UartStopBits,
}

impl UartConfig {
    /// Low three bits of the UART config command
    pub fn config_bits(&self) -> u8 {
        (self.parity.to_bits() << 1) | (self.stop_bits == UartStopBits::Two) as u8
    }
}

// ============================================================================
// 1-Wire
// ============================================================================

/// 1-Wire sub-mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneWireConfig {
    /// Enable the internal pullup
    pub pullup: bool,
}

impl Default for OneWireConfig {
    fn default() -> Self {
        // The bus is open-drain; the firmware default keeps the pullup on
        Self { pullup: true }
    }
}

impl OneWireConfig {
    /// Low three bits of the 1-Wire config command
    pub fn config_bits(&self) -> u8 {
        (self.pullup as u8) << 2
    }
}

// ============================================================================
// CAN
// ============================================================================

/// CAN nominal bitrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanBitrate {
    /// 10 kbps
    Kbps10,
    /// 20 kbps
    Kbps20,
    /// 50 kbps
    Kbps50,
    /// 100 kbps
    Kbps100,
    /// 125 kbps
    Kbps125,
    /// 250 kbps
    Kbps250,
    /// 500 kbps
    #[default]
    Kbps500,
    /// 1 Mbps
    Mbps1,
}

impl CanBitrate {
    /// Low three bits of the CAN speed command
    pub fn to_bits(self) -> u8 {
        match self {
            CanBitrate::Kbps10 => 0b000,
            CanBitrate::Kbps20 => 0b001,
            CanBitrate::Kbps50 => 0b010,
            CanBitrate::Kbps100 => 0b011,
            CanBitrate::Kbps125 => 0b100,
            CanBitrate::Kbps250 => 0b101,
            CanBitrate::Kbps500 => 0b110,
            CanBitrate::Mbps1 => 0b111,
        }
    }
}

/// CAN sub-mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanConfig {
    /// Nominal bitrate
    pub bitrate: CanBitrate,
}

// ============================================================================
// MMC
// ============================================================================

/// MMC data bus width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MmcBusWidth {
    /// Single data line
    #[default]
    One,
    /// Four data lines
    Four,
}

/// MMC sub-mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MmcConfig {
    /// Data bus width
    pub bus_width: MmcBusWidth,
}

impl MmcConfig {
    /// Low bit of the MMC config command
    pub fn config_bits(&self) -> u8 {
        (self.bus_width == MmcBusWidth::Four) as u8
    }
}
