//! HydraBus binary protocol constants
//!
//! This module contains the byte values used by the HydraFW binary ("BBIO")
//! protocol: the handshake sequences, the per-sub-mode select bytes and
//! identification signatures, and the opcode tables of each sub-mode.

// ============================================================================
// Binary Mode Handshake
// ============================================================================

/// Byte sent (repeatedly) from the text console to enter binary mode
pub const BBIO_ENTER: u8 = 0x00;
/// Signature returned by the device once binary mode is active
pub const BBIO_SIGNATURE: &[u8; 5] = b"BBIO1";
/// Maximum number of 0x00 probes sent before giving up on binary mode entry
pub const BBIO_ENTER_ATTEMPTS: usize = 20;
/// Byte sent from a sub-mode to return to the binary bridge
pub const BBIO_EXIT_SUBMODE: u8 = 0x00;
/// Byte sent from the binary bridge to reset the device back to the console
pub const BBIO_RESET: u8 = 0x0F;
/// Length of a sub-mode identification signature (including the version byte)
pub const MODE_SIGNATURE_LEN: usize = 4;

// ============================================================================
// Status Bytes
// ============================================================================

/// Command accepted / completed
pub const STATUS_OK: u8 = 0x01;
/// Command rejected by the device
pub const STATUS_ERROR: u8 = 0x00;

// ============================================================================
// Sub-mode Select Bytes (written while in the binary bridge)
// ============================================================================

/// Enter SPI mode (answers `SPI1`)
pub const MODE_SELECT_SPI: u8 = 0x01;
/// Enter I2C mode (answers `I2C1`)
pub const MODE_SELECT_I2C: u8 = 0x02;
/// Enter UART mode (answers `ART1`)
pub const MODE_SELECT_UART: u8 = 0x03;
/// Enter 1-Wire mode (answers `1W01`)
pub const MODE_SELECT_ONEWIRE: u8 = 0x04;
/// Enter CAN mode (answers `CAN1`)
pub const MODE_SELECT_CAN: u8 = 0x08;
/// Enter GPIO mode (answers `PIN1`)
pub const MODE_SELECT_GPIO: u8 = 0x09;
/// Enter MMC mode (answers `MMC1`)
pub const MODE_SELECT_MMC: u8 = 0x0D;

// ============================================================================
// Shared Sub-mode Encodings
// ============================================================================

/// Bulk transfer opcode base; the low nibble carries (length - 1)
pub const CMD_BULK_BASE: u8 = 0b0001_0000;
/// Maximum payload of a single bulk transfer
pub const BULK_MAX_LEN: usize = 16;

// ============================================================================
// SPI Mode Opcodes
// ============================================================================

/// Chip-select control base; the low bit carries the CS level
pub const SPI_CMD_CS_BASE: u8 = 0b0000_0010;
/// Write-then-read base; the low bit disables automatic chip-select
pub const SPI_CMD_WRITE_READ_BASE: u8 = 0b0000_0100;
/// Bus speed select base; the low three bits carry the speed index
pub const SPI_CMD_SET_SPEED_BASE: u8 = 0b0110_0000;
/// Port configuration base; the low three bits carry polarity/phase/device
pub const SPI_CMD_CONFIG_BASE: u8 = 0b1000_0000;

// ============================================================================
// I2C Mode Opcodes
// ============================================================================

/// Issue a start condition
pub const I2C_CMD_START: u8 = 0x02;
/// Issue a stop condition
pub const I2C_CMD_STOP: u8 = 0x03;
/// Clock in one byte
pub const I2C_CMD_READ_BYTE: u8 = 0x04;
/// Acknowledge the last byte read
pub const I2C_CMD_SEND_ACK: u8 = 0x06;
/// Refuse the last byte read
pub const I2C_CMD_SEND_NACK: u8 = 0x07;
/// Write-then-read with explicit u16 lengths
pub const I2C_CMD_WRITE_READ: u8 = 0x08;
/// Set the clock-stretch timeout (u32 clocks, 0 disables)
pub const I2C_CMD_CLOCK_STRETCH: u8 = 0x20;
/// Bus speed select base; the low two bits carry the speed index
pub const I2C_CMD_SET_SPEED_BASE: u8 = 0b0110_0000;
/// Port configuration base; bit 2 enables the pullups
pub const I2C_CMD_CONFIG_BASE: u8 = 0b0100_0000;

/// First I2C address probed by a bus scan
pub const I2C_SCAN_FIRST: u8 = 0x01;
/// One past the last I2C address probed by a bus scan
pub const I2C_SCAN_LAST: u8 = 0x78;

// ============================================================================
// UART Mode Opcodes
// ============================================================================

/// RX echo control base; the low bit starts (1) or stops (0) echoing
pub const UART_CMD_ECHO_BASE: u8 = 0b0000_0010;
/// Baud rate select base; the low four bits carry the baud index
pub const UART_CMD_SET_SPEED_BASE: u8 = 0b0110_0000;
/// Port configuration base; the low bits carry parity and stop bits
pub const UART_CMD_CONFIG_BASE: u8 = 0b1000_0000;

// ============================================================================
// 1-Wire Mode Opcodes
// ============================================================================

/// Issue a reset pulse (no response)
pub const ONEWIRE_CMD_RESET: u8 = 0x02;
/// Clock in one byte
pub const ONEWIRE_CMD_READ_BYTE: u8 = 0x04;
/// Port configuration base; bit 2 enables the pullup
pub const ONEWIRE_CMD_CONFIG_BASE: u8 = 0b0100_0000;

// ============================================================================
// CAN Mode Opcodes
// ============================================================================

/// Receive one frame from the bus
pub const CAN_CMD_READ: u8 = 0x02;
/// Set the acceptance filter (u32 low ID + u32 high ID)
pub const CAN_CMD_SET_FILTER: u8 = 0x05;
/// Transmit one frame (u32 ID + DLC + data)
pub const CAN_CMD_WRITE: u8 = 0x08;
/// Bitrate select base; the low three bits carry the bitrate index
pub const CAN_CMD_SET_SPEED_BASE: u8 = 0b0110_0000;

/// Maximum data length of a classic CAN frame
pub const CAN_MAX_DLEN: usize = 8;
/// On-wire RX frame length: u32 ID + DLC + 8 data bytes (zero padded)
pub const CAN_WIRE_FRAME_LEN: usize = 13;

// ============================================================================
// GPIO Mode Opcodes
// ============================================================================

/// Set the pin direction mask (bit set = output)
pub const GPIO_CMD_SET_DIRECTION: u8 = 0x02;
/// Read the level of all pins
pub const GPIO_CMD_READ: u8 = 0x03;
/// Write the level of all output pins
pub const GPIO_CMD_WRITE: u8 = 0x04;

/// Number of pins exposed in GPIO mode
pub const GPIO_PIN_COUNT: u8 = 8;

// ============================================================================
// MMC Mode Opcodes
// ============================================================================

/// Read the 16-byte CID register
pub const MMC_CMD_CID: u8 = 0x02;
/// Read the 16-byte CSD register
pub const MMC_CMD_CSD: u8 = 0x03;
/// Read one 512-byte block (u32 block number)
pub const MMC_CMD_READ_BLOCK: u8 = 0x04;
/// Write one 512-byte block (u32 block number + data)
pub const MMC_CMD_WRITE_BLOCK: u8 = 0x05;
/// Read the 512-byte extended CSD register
pub const MMC_CMD_EXT_CSD: u8 = 0x06;
/// Port configuration base; bit 0 selects the 4-bit bus
pub const MMC_CMD_CONFIG_BASE: u8 = 0b1000_0000;

/// Length of the CID and CSD registers
pub const MMC_REGISTER_LEN: usize = 16;
/// Length of an MMC data block and of the extended CSD register
pub const MMC_BLOCK_LEN: usize = 512;

// ============================================================================
// Protocol Defaults
// ============================================================================

/// Default per-read timeout for command responses, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
/// Per-probe read timeout during the binary mode handshake, in milliseconds
pub const HANDSHAKE_POLL_TIMEOUT_MS: u64 = 100;
/// Number of re-sends allowed for an idempotent command after a bad outcome
pub const COMMAND_RETRY_LIMIT: usize = 1;
/// Default baud rate for the serial transport (CDC-ACM, value is nominal)
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
