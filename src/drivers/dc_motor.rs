use super::pca9685::{Pca9685Error, SharedPca9685, CHANNEL_COUNT};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DecayMode {
    /// Recirculation current decays quickly, motor spins freely between pulses.
    #[default]
    Fast,
    /// Recirculation current decays slowly, gives finer low-speed control.
    Slow
}

#[derive(Debug, PartialEq, Clone)]
pub enum MotorError {
    Controller(Pca9685Error),
    InvalidThrottle(f32),
    InvalidChannels(u8, u8)
}

impl Display for MotorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            MotorError::Controller(e) => format!("PWM controller error: {}", e),
            MotorError::InvalidThrottle(t) => format!("throttle {} is outside -1.0..=1.0", t),
            MotorError::InvalidChannels(a, b) => format!("invalid motor channel pair ({}, {})", a, b),
        })
    }
}

impl std::error::Error for MotorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MotorError::Controller(e) => Some(e),
            _ => None
        }
    }
}

impl From<Pca9685Error> for MotorError {
    fn from(err: Pca9685Error) -> Self {
        MotorError::Controller(err)
    }
}

/// Duty cycles for the (positive, negative) terminals. `None` lets the motor coast.
pub fn terminal_duty_cycles(throttle: Option<f32>, decay_mode: DecayMode) -> Result<(u16, u16), MotorError> {
    let throttle = match throttle {
        None => return Ok((0, 0)),
        Some(t) if !(-1.0..=1.0).contains(&t) => return Err(MotorError::InvalidThrottle(t)),
        Some(t) => t
    };

    if throttle == 0.0 {
        return Ok((0xFFFF, 0xFFFF));
    }

    let duty_cycle = (0xFFFF as f32 * throttle.abs()) as u16;
    Ok(match (decay_mode, throttle > 0.0) {
        (DecayMode::Slow, true) => (0xFFFF, 0xFFFF - duty_cycle),
        (DecayMode::Slow, false) => (0xFFFF - duty_cycle, 0xFFFF),
        (DecayMode::Fast, true) => (duty_cycle, 0),
        (DecayMode::Fast, false) => (0, duty_cycle),
    })
}

/// Brushed DC motor wired to two PWM outputs through an H-bridge.
pub struct DcMotor {
    controller: SharedPca9685,
    positive_channel: u8,
    negative_channel: u8,
    decay_mode: DecayMode,
    throttle: Option<f32>
}

impl DcMotor {
    pub fn new(controller: SharedPca9685, positive_channel: u8, negative_channel: u8) -> Result<Self, MotorError> {
        if positive_channel == negative_channel
            || positive_channel >= CHANNEL_COUNT
            || negative_channel >= CHANNEL_COUNT
        {
            return Err(MotorError::InvalidChannels(positive_channel, negative_channel));
        }

        Ok(DcMotor {
            controller,
            positive_channel,
            negative_channel,
            decay_mode: DecayMode::default(),
            throttle: None
        })
    }

    pub fn channels(&self) -> (u8, u8) {
        (self.positive_channel, self.negative_channel)
    }

    pub fn decay_mode(&self) -> DecayMode {
        self.decay_mode
    }

    pub fn set_decay_mode(&mut self, decay_mode: DecayMode) {
        self.decay_mode = decay_mode;
    }

    pub fn throttle(&self) -> Option<f32> {
        self.throttle
    }

    pub fn set_throttle(&mut self, throttle: Option<f32>) -> Result<(), MotorError> {
        let (positive, negative) = terminal_duty_cycles(throttle, self.decay_mode)?;

        let mut controller = self.controller.lock();
        controller.set_duty_cycle(self.positive_channel, positive)?;
        controller.set_duty_cycle(self.negative_channel, negative)?;
        drop(controller);

        self.throttle = throttle;
        Ok(())
    }
}
