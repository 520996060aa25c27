//! HydraBus Binary Protocol Implementation for Rust
//!
//! This crate provides a Rust implementation of the HydraFW binary ("BBIO")
//! protocol for driving a HydraBus multi-tool over its serial interface,
//! giving host programs access to the SPI, I2C, UART, 1-Wire, CAN, GPIO and
//! MMC buses behind it.
//!
//! # Features
//!
//! - Explicit session state machine (console / binary bridge / bound
//!   sub-mode), verified against the device's own identification responses
//! - Synchronous single-outstanding-transaction dispatcher with bounded
//!   retries for idempotent commands
//! - Local validation of bus parameters before any byte hits the wire
//! - Typed per-bus drivers sharing one session
//!
//! # Example
//!
//! ```no_run
//! use hydrabus::{HydraBus, I2cConfig, I2cSpeed, SpiConfig};
//!
//! fn main() -> hydrabus::Result<()> {
//!     // Open the serial device and switch into binary bridge mode
//!     let mut hb = HydraBus::open("/dev/ttyACM0")?;
//!     hb.enter_binary()?;
//!
//!     // Read a flash chip's JEDEC ID over SPI
//!     let mut spi = hb.spi(SpiConfig::default())?;
//!     let id = spi.write_read(&[0x9F], 3)?;
//!     println!("JEDEC ID: {:02X} {:02X} {:02X}", id[0], id[1], id[2]);
//!     spi.exit()?;
//!
//!     // Switch to I2C and scan the bus
//!     let mut i2c = hb.i2c(I2cConfig {
//!         speed: I2cSpeed::Khz400,
//!         pullup: true,
//!     })?;
//!     for addr in i2c.scan()? {
//!         println!("Found device at 0x{:02X}", addr);
//!     }
//!     i2c.exit()?;
//!
//!     hb.disconnect()
//! }
//! ```

pub mod can;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod frame;
pub mod gpio;
pub mod i2c;
pub mod mmc;
pub mod mode;
pub mod onewire;
pub mod spi;
pub mod transport;
pub mod uart;

// Re-export main types at crate root
pub use can::{Can, CanFrame, CAN_EFF_FLAG, CAN_EFF_MASK, CAN_SFF_MASK};
pub use config::{
    CanBitrate, CanConfig, I2cConfig, I2cSpeed, MmcBusWidth, MmcConfig, OneWireConfig, SpiConfig,
    SpiDevice, SpiSpeed, UartBaud, UartConfig, UartParity, UartStopBits,
};
pub use device::HydraBus;
pub use error::{HydraBusError, Result};
pub use frame::{Command, Response, ResponseShape, Scope};
pub use gpio::Gpio;
pub use i2c::I2c;
pub use mmc::Mmc;
pub use mode::{descriptor, BusKind, Mode, ModeDescriptor, MODE_TABLE};
pub use onewire::OneWire;
pub use spi::Spi;
pub use transport::{SerialTransport, Transport};
pub use uart::Uart;
