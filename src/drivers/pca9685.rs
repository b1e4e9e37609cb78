use crate::bus::{self, I2CError, SharedBus};
use log::{debug, trace};
use parking_lot::Mutex;
use std::{fmt::Display, sync::Arc, thread, time::Duration};

pub type SharedPca9685 = Arc<Mutex<Pca9685>>;

pub const CHANNEL_COUNT: u8 = 16;
pub const REFERENCE_CLOCK_HZ: f32 = 25_000_000.0;

const REGISTER_MODE1: u8 = 0x00;
const REGISTER_LED0_ON_L: u8 = 0x06;
const REGISTER_ALL_LED_OFF_H: u8 = 0xFD;
const REGISTER_PRESCALE: u8 = 0xFE;

const MODE1_RESTART: u8 = 0x80;
const MODE1_AUTO_INCREMENT: u8 = 0x20;
const MODE1_SLEEP: u8 = 0x10;

const FULL_ON_OFF_BIT: u16 = 0x1000;
const MIN_PRESCALE: u32 = 3;
const MAX_PRESCALE: u32 = 0xFF;
const OSCILLATOR_SETTLE: Duration = Duration::from_millis(5);

#[derive(Debug, PartialEq, Clone)]
pub enum Pca9685Error {
    Bus(I2CError),
    InvalidChannel(u8),
    UnsupportedFrequency(u16),
    Released
}

impl Display for Pca9685Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            Pca9685Error::Bus(e) => format!("bus error: {}", e),
            Pca9685Error::InvalidChannel(c) => format!("PWM channel {} does not exist, valid channels are 0-{}", c, CHANNEL_COUNT - 1),
            Pca9685Error::UnsupportedFrequency(hz) => format!("PCA9685 cannot output at {} Hz", hz),
            Pca9685Error::Released => format!("controller has been released"),
        })
    }
}

impl std::error::Error for Pca9685Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Pca9685Error::Bus(e) => Some(e),
            _ => None
        }
    }
}

impl From<I2CError> for Pca9685Error {
    fn from(err: I2CError) -> Self {
        Pca9685Error::Bus(err)
    }
}

/// Prescaler value for the requested output frequency, rounded to nearest.
pub fn prescale_for(frequency: u16) -> Result<u8, Pca9685Error> {
    if frequency == 0 {
        return Err(Pca9685Error::UnsupportedFrequency(frequency));
    }

    let prescale = (REFERENCE_CLOCK_HZ / 4096.0 / frequency as f32 + 0.5) as u32;
    if prescale < MIN_PRESCALE || prescale > MAX_PRESCALE {
        return Err(Pca9685Error::UnsupportedFrequency(frequency));
    }

    Ok(prescale as u8)
}

/// Maps a 16-bit duty cycle onto the (on, off) tick pair of one channel.
pub fn duty_cycle_to_ticks(duty_cycle: u16) -> (u16, u16) {
    if duty_cycle == 0xFFFF {
        (FULL_ON_OFF_BIT, 0)
    } else if duty_cycle < 0x0010 {
        (0, FULL_ON_OFF_BIT)
    } else {
        (0, duty_cycle >> 4)
    }
}

pub fn ticks_to_duty_cycle(on: u16, off: u16) -> u16 {
    if on & FULL_ON_OFF_BIT != 0 {
        0xFFFF
    } else if off & FULL_ON_OFF_BIT != 0 {
        0
    } else {
        off << 4
    }
}

fn channel_register(channel: u8) -> Result<u8, Pca9685Error> {
    if channel >= CHANNEL_COUNT {
        return Err(Pca9685Error::InvalidChannel(channel));
    }

    Ok(REGISTER_LED0_ON_L + 4 * channel)
}

/// 16 channel, 12-bit PWM controller.
pub struct Pca9685 {
    bus: SharedBus,
    address: u8,
    frequency: Option<u16>,
    released: bool
}

impl std::fmt::Debug for Pca9685 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pca9685")
            .field("address", &format_args!("0x{:02X}", self.address))
            .field("frequency", &self.frequency)
            .field("released", &self.released)
            .finish()
    }
}

impl Pca9685 {
    /// Resets the chip at `address` and reads MODE1 back. Fails unless both transactions succeed.
    pub fn new(bus: SharedBus, address: u8) -> Result<Self, Pca9685Error> {
        let mut controller = Pca9685 { bus, address, frequency: None, released: false };
        controller.reset()?;

        let mode1 = controller.read_mode1()?;
        trace!("PCA9685 at 0x{:02X} reports MODE1 = 0x{:02X}", address, mode1);
        Ok(controller)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Last frequency applied through [`Pca9685::set_frequency`].
    pub fn frequency(&self) -> Option<u16> {
        self.frequency
    }

    /// Frequency actually produced by the prescaler currently loaded on the chip.
    pub fn effective_frequency(&self) -> Result<f32, Pca9685Error> {
        self.assert_state()?;
        let mut transaction = self.bus.lock();
        let prescale = bus::read_register_u8(&mut *transaction, self.address, REGISTER_PRESCALE)?;
        if (prescale as u32) < MIN_PRESCALE {
            return Err(Pca9685Error::Bus(I2CError::HardwareError(
                format!("PCA9685 at 0x{:02X} has an invalid prescaler {}", self.address, prescale)
            )));
        }

        Ok(REFERENCE_CLOCK_HZ / 4096.0 / prescale as f32)
    }

    pub fn reset(&mut self) -> Result<(), Pca9685Error> {
        let mut transaction = self.bus.lock();
        bus::write_register(&mut *transaction, self.address, REGISTER_MODE1, 0x00)?;
        self.released = false;
        Ok(())
    }

    pub fn set_frequency(&mut self, frequency: u16) -> Result<(), Pca9685Error> {
        self.assert_state()?;
        let prescale = prescale_for(frequency)?;

        let mut transaction = self.bus.lock();
        let old_mode = bus::read_register_u8(&mut *transaction, self.address, REGISTER_MODE1)?;

        // prescaler can only be written while the oscillator is asleep
        bus::write_register(&mut *transaction, self.address, REGISTER_MODE1, (old_mode & !MODE1_RESTART) | MODE1_SLEEP)?;
        bus::write_register(&mut *transaction, self.address, REGISTER_PRESCALE, prescale)?;
        bus::write_register(&mut *transaction, self.address, REGISTER_MODE1, old_mode)?;
        thread::sleep(OSCILLATOR_SETTLE);
        bus::write_register(&mut *transaction, self.address, REGISTER_MODE1, old_mode | MODE1_RESTART | MODE1_AUTO_INCREMENT)?;

        debug!("PCA9685 at 0x{:02X} set to {} Hz (prescale {})", self.address, frequency, prescale);
        self.frequency = Some(frequency);
        Ok(())
    }

    pub fn set_duty_cycle(&mut self, channel: u8, duty_cycle: u16) -> Result<(), Pca9685Error> {
        self.assert_state()?;
        let register = channel_register(channel)?;
        let (on, off) = duty_cycle_to_ticks(duty_cycle);

        let mut transaction = self.bus.lock();
        transaction.write(self.address, &[
            register,
            (on & 0xFF) as u8,
            (on >> 8) as u8,
            (off & 0xFF) as u8,
            (off >> 8) as u8,
        ])?;

        Ok(())
    }

    pub fn duty_cycle(&self, channel: u8) -> Result<u16, Pca9685Error> {
        self.assert_state()?;
        let register = channel_register(channel)?;

        let mut buf = [0u8; 4];
        let mut transaction = self.bus.lock();
        bus::read_register(&mut *transaction, self.address, register, &mut buf)?;

        let on = (buf[1] as u16) << 8 | buf[0] as u16;
        let off = (buf[3] as u16) << 8 | buf[2] as u16;
        Ok(ticks_to_duty_cycle(on, off))
    }

    /// Turns every output off and puts the oscillator to sleep.
    pub fn deinit(&mut self) -> Result<(), Pca9685Error> {
        if self.released {
            return Ok(());
        }

        let mut transaction = self.bus.lock();
        bus::write_register(&mut *transaction, self.address, REGISTER_ALL_LED_OFF_H, (FULL_ON_OFF_BIT >> 8) as u8)?;
        bus::write_register(&mut *transaction, self.address, REGISTER_MODE1, MODE1_SLEEP)?;
        drop(transaction);

        debug!("PCA9685 at 0x{:02X} powered down", self.address);
        self.released = true;
        self.frequency = None;
        Ok(())
    }

    fn read_mode1(&self) -> Result<u8, Pca9685Error> {
        let mut transaction = self.bus.lock();
        Ok(bus::read_register_u8(&mut *transaction, self.address, REGISTER_MODE1)?)
    }

    fn assert_state(&self) -> Result<(), Pca9685Error> {
        if self.released {
            Err(Pca9685Error::Released)
        } else {
            Ok(())
        }
    }
}
