use crate::bus::{I2CError, SharedBus};
use std::fmt::Display;

pub const CHANNEL_COUNT: u8 = 8;

const COMMAND_SINGLE_ENDED: u8 = 0x80;
const POWER_DOWN_REFERENCE_ON: u8 = 0x02;
const POWER_DOWN_ADC_ON: u8 = 0x01;

#[derive(Debug, PartialEq, Clone)]
pub enum Ads7830Error {
    Bus(I2CError),
    InvalidChannel(u8)
}

impl Display for Ads7830Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            Ads7830Error::Bus(e) => format!("bus error: {}", e),
            Ads7830Error::InvalidChannel(c) => format!("ADC channel {} does not exist, valid channels are 0-{}", c, CHANNEL_COUNT - 1),
        })
    }
}

impl std::error::Error for Ads7830Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Ads7830Error::Bus(e) => Some(e),
            _ => None
        }
    }
}

impl From<I2CError> for Ads7830Error {
    fn from(err: I2CError) -> Self {
        Ads7830Error::Bus(err)
    }
}

/// Single-ended command byte for `channel`, with the internal reference and converter kept on.
pub fn command_byte(channel: u8) -> Result<u8, Ads7830Error> {
    if channel >= CHANNEL_COUNT {
        return Err(Ads7830Error::InvalidChannel(channel));
    }

    // channel select bits are C2 = odd/even, C1..C0 = pair index
    let select = ((channel & 0x01) << 2) | (channel >> 1);
    Ok(COMMAND_SINGLE_ENDED | (select << 4) | ((POWER_DOWN_REFERENCE_ON | POWER_DOWN_ADC_ON) << 2))
}

/// 8 channel, 8-bit successive approximation ADC.
pub struct Ads7830 {
    bus: SharedBus,
    address: u8
}

impl Ads7830 {
    /// Performs one conversion on channel 0 so an absent chip fails here rather than on first use.
    pub fn new(bus: SharedBus, address: u8) -> Result<Self, Ads7830Error> {
        let adc = Ads7830 { bus, address };
        adc.read(0)?;
        Ok(adc)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Raw 8-bit conversion result.
    pub fn read(&self, channel: u8) -> Result<u8, Ads7830Error> {
        let command = command_byte(channel)?;
        let mut buf = [0u8; 1];
        self.bus.lock().write_read(self.address, &[command], &mut buf)?;
        Ok(buf[0])
    }

    /// Conversion result left-justified into 16 bits.
    pub fn value(&self, channel: u8) -> Result<u16, Ads7830Error> {
        Ok((self.read(channel)? as u16) << 8)
    }
}

/// One input pin of a shared [`Ads7830`].
pub struct AnalogIn<'a> {
    adc: &'a Ads7830,
    channel: u8
}

impl<'a> AnalogIn<'a> {
    pub fn new(adc: &'a Ads7830, channel: u8) -> Result<Self, Ads7830Error> {
        if channel >= CHANNEL_COUNT {
            return Err(Ads7830Error::InvalidChannel(channel));
        }

        Ok(AnalogIn { adc, channel })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn value(&self) -> Result<u16, Ads7830Error> {
        self.adc.value(self.channel)
    }
}
