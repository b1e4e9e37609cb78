//! The HAT's four motor ports, each an H-bridge driven by two PCA9685 outputs.

use crate::drivers::dc_motor::{DcMotor, DecayMode, MotorError};
use crate::hat::{HatError, Pca9685Context};
use log::{debug, warn};
use std::fmt::Display;
use strum::{EnumIter, IntoEnumIterator};

pub const MOTOR_FREQUENCY: u16 = 50;
pub const MAX_SPEED: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum MotorSlot {
    M1 = 1,
    M2 = 2,
    M3 = 3,
    M4 = 4
}

impl MotorSlot {
    /// PCA9685 outputs wired to (IN1, IN2) of this port.
    pub const fn channels(self) -> (u8, u8) {
        match self {
            MotorSlot::M1 => (15, 14),
            MotorSlot::M2 => (12, 13),
            MotorSlot::M3 => (11, 10),
            MotorSlot::M4 => (8, 9),
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        MotorSlot::iter().find(|slot| *slot as u8 == index)
    }

    const fn position(self) -> usize {
        self as usize - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward
}

impl Direction {
    /// `-1` selects [`Direction::Backward`], anything else [`Direction::Forward`].
    pub fn from_sign(sign: i8) -> Self {
        if sign == -1 {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum DriveError {
    Hat(HatError),
    Motor(MotorSlot, MotorError)
}

impl Display for DriveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            DriveError::Hat(e) => format!("motor controller unavailable: {}", e),
            DriveError::Motor(slot, e) => format!("motor {:?} failed: {}", slot, e),
        })
    }
}

impl std::error::Error for DriveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriveError::Hat(e) => Some(e),
            DriveError::Motor(_, e) => Some(e),
        }
    }
}

impl From<HatError> for DriveError {
    fn from(err: HatError) -> Self {
        DriveError::Hat(err)
    }
}

pub fn map_range(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    (x - in_min) / (in_max - in_min) * (out_max - out_min) + out_min
}

/// Clamps `speed` to 0..=100 and maps it onto a throttle, negative when reversing.
pub fn speed_to_throttle(direction: Direction, speed: f32) -> f32 {
    let speed = speed.clamp(0.0, MAX_SPEED);
    let throttle = map_range(speed, 0.0, MAX_SPEED, 0.0, 1.0);
    match direction {
        Direction::Forward => throttle,
        Direction::Backward => -throttle,
    }
}

pub struct Motors {
    motors: Vec<DcMotor>
}

impl Motors {
    pub fn setup(context: &Pca9685Context, frequency: u16) -> Result<Self, DriveError> {
        let controller = context.get_pca9685(frequency, None)?;

        let mut motors = Vec::new();
        for slot in MotorSlot::iter() {
            let (in1, in2) = slot.channels();
            let mut motor = DcMotor::new(controller.clone(), in1, in2)
                .map_err(|e| DriveError::Motor(slot, e))?;
            motor.set_decay_mode(DecayMode::Slow);
            motors.push(motor);
        }

        Ok(Motors { motors })
    }

    pub fn motor(&self, slot: MotorSlot) -> &DcMotor {
        &self.motors[slot.position()]
    }

    pub fn set(&mut self, slot: MotorSlot, direction: Direction, speed: f32) -> Result<(), DriveError> {
        let throttle = speed_to_throttle(direction, speed);
        debug!("Motor {:?} throttle {:.2}", slot, throttle);
        self.motors[slot.position()]
            .set_throttle(Some(throttle))
            .map_err(|e| DriveError::Motor(slot, e))
    }

    /// Brakes every motor. All ports are attempted, the first failure is returned.
    pub fn stop(&mut self) -> Result<(), DriveError> {
        let mut result = Ok(());
        for slot in MotorSlot::iter() {
            if let Err(e) = self.motors[slot.position()].set_throttle(Some(0.0)) {
                if result.is_ok() {
                    result = Err(DriveError::Motor(slot, e));
                }
            }
        }

        result
    }

    /// Stops the motors and releases the shared controller.
    pub fn destroy(mut self, context: &Pca9685Context) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors: {}", e);
        }

        context.deinit();
    }
}
