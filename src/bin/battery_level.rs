//! Prints the battery voltage twice a second until interrupted.

use adeept_hat::battery::{build_channels, detect_ads7830, read_voltage, BATTERY_CHANNEL};
use adeept_hat::bus;
use adeept_hat::config::HatConfig;
use adeept_hat::interrupt::{install_handler, sleep_while_running};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::error::Error;
use std::time::Duration;

const POLL_PERIOD: Duration = Duration::from_millis(500);

fn main() -> Result<(), Box<dyn Error>> {
    SimpleLogger::new().with_level(LevelFilter::Info).env().init()?;
    let running = install_handler()?;

    let config = HatConfig::load()?;
    let bus = bus::open(config.backend, config.bus_id)?;
    let adc = detect_ads7830(&bus, &config.battery_addresses)?;
    let channels = build_channels(&adc)?;
    let battery = &channels[BATTERY_CHANNEL as usize];

    loop {
        println!("battery level = {:.2} V", read_voltage(battery)?);
        if !sleep_while_running(&running, POLL_PERIOD) {
            break;
        }
    }

    Ok(())
}
