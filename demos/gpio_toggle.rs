//! GPIO Toggle Example
//!
//! Configures pin 0 as an output and toggles it ten times while reading
//! the bank back between writes.

use std::thread;
use std::time::Duration;

use hydrabus::{HydraBus, HydraBusError};

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

    let mut gpio = hb.gpio()?;
    gpio.set_direction(0, true)?;

    for i in 0..10 {
        let level = i % 2 == 0;
        gpio.set_pin(0, level)?;
        let pins = gpio.read_pins()?;
        println!(
            "Pin 0 driven {} - bank reads 0b{:08b}",
            if level { "high" } else { "low" },
            pins
        );
        thread::sleep(Duration::from_millis(250));
    }

    gpio.set_pin(0, false)?;
    gpio.exit()?;
    hb.disconnect()
}
