//! I2C Bus Scan Example
//!
//! Probes every 7-bit address on the I2C bus and prints the devices that
//! acknowledge, similar to `i2cdetect`.

use hydrabus::{HydraBus, HydraBusError, I2cConfig, I2cSpeed};

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

    let mut i2c = hb.i2c(I2cConfig {
        speed: I2cSpeed::Khz100,
        pullup: true,
    })?;

    println!("Scanning I2C bus (100 kHz, pullups on)...");
    let found = i2c.scan()?;

    if found.is_empty() {
        println!("No devices answered");
    } else {
        for addr in &found {
            println!("  0x{:02X} acknowledged", addr);
        }
        println!("{} device(s) found", found.len());
    }

    i2c.exit()?;
    hb.disconnect()
}
