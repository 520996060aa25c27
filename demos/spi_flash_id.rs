//! SPI Flash Identification Example
//!
//! Reads the JEDEC ID and the status register of an SPI flash chip wired
//! to the HydraBus SPI header:
//!
//! 1. Enter binary bridge mode
//! 2. Bind SPI mode at 10 MHz
//! 3. RDID (0x9F) - read the 3-byte JEDEC ID
//! 4. RDSR (0x05) - read the status register

use hydrabus::{HydraBus, HydraBusError, SpiConfig, SpiSpeed};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), HydraBusError> {
    let device = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyACM0".to_string());

    println!("Connecting to HydraBus at {}...", device);
    let mut hb = HydraBus::open(&device)?;
    hb.enter_binary()?;
    println!("Binary bridge up, mode: {}", hb.mode());

    let mut spi = hb.spi(SpiConfig {
        speed: SpiSpeed::Mhz10,
        ..Default::default()
    })?;

    println!("=== JEDEC ID (RDID) ===");
    let id = spi.write_read(&[0x9F], 3)?;
    println!(
        "Manufacturer 0x{:02X}, type 0x{:02X}, capacity 0x{:02X}",
        id[0], id[1], id[2]
    );

    println!("=== Status Register (RDSR) ===");
    let sr = spi.write_read(&[0x05], 1)?;
    println!("SR1 = 0x{:02X}", sr[0]);

    spi.exit()?;
    hb.disconnect()?;
    println!("Done.");
    Ok(())
}
