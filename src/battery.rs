//! Battery voltage sensing through the HAT's ADS7830.

use crate::bus::SharedBus;
use crate::drivers::ads7830::{Ads7830, Ads7830Error, AnalogIn, CHANNEL_COUNT};
use log::{debug, info};
use std::{fmt::Display, thread, time::Duration};

pub const BATTERY_CHANNEL: u8 = 0;
/// Pack voltage corresponding to a full-scale reading.
pub const FULL_SCALE_VOLTS: f32 = 8.4;

const PROBE_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, PartialEq, Clone)]
pub enum BatteryError {
    NotDetected {
        addresses: Vec<u8>,
        source: Option<Ads7830Error>
    },
    Adc(Ads7830Error)
}

impl Display for BatteryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            BatteryError::NotDetected { .. } => format!("no ADS7830 detected, check wiring or set ADEEPT_BAT_ADDR"),
            BatteryError::Adc(e) => format!("ADS7830 error: {}", e),
        })
    }
}

impl std::error::Error for BatteryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatteryError::NotDetected { source: Some(e), .. } => Some(e),
            BatteryError::NotDetected { source: None, .. } => None,
            BatteryError::Adc(e) => Some(e),
        }
    }
}

impl From<Ads7830Error> for BatteryError {
    fn from(err: Ads7830Error) -> Self {
        BatteryError::Adc(err)
    }
}

/// Returns the first ADS7830 that answers, pausing briefly after each miss.
pub fn detect_ads7830(bus: &SharedBus, addresses: &[u8]) -> Result<Ads7830, BatteryError> {
    let mut last_error = None;
    for &address in addresses {
        match Ads7830::new(bus.clone(), address) {
            Ok(adc) => {
                info!("ADS7830 detected on address 0x{:02X}", address);
                return Ok(adc);
            }
            Err(e) => {
                debug!("No ADS7830 at 0x{:02X}: {}", address, e);
                last_error = Some(e);
                thread::sleep(PROBE_DELAY);
            }
        }
    }

    Err(BatteryError::NotDetected { addresses: addresses.to_vec(), source: last_error })
}

pub fn build_channels(adc: &Ads7830) -> Result<Vec<AnalogIn<'_>>, BatteryError> {
    let mut channels = Vec::new();
    for channel in 0..CHANNEL_COUNT {
        channels.push(AnalogIn::new(adc, channel)?);
    }

    Ok(channels)
}

pub fn battery_voltage(value: u16) -> f32 {
    value as f32 / u16::MAX as f32 * FULL_SCALE_VOLTS
}

pub fn read_voltage(channel: &AnalogIn<'_>) -> Result<f32, BatteryError> {
    Ok(battery_voltage(channel.value()?))
}
