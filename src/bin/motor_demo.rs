//! Drives motor ports M1 and M2 back and forth ten times, then stops.

use adeept_hat::config::HatConfig;
use adeept_hat::hat::Pca9685Context;
use adeept_hat::interrupt::{install_handler, sleep_while_running};
use adeept_hat::motor::{Direction, DriveError, MotorSlot, Motors, MOTOR_FREQUENCY};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::error::Error;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

const ITERATIONS: usize = 10;
const SPEED: f32 = 50.0;
const HOLD: Duration = Duration::from_secs(2);

fn run(motors: &mut Motors, running: &AtomicBool) -> Result<(), DriveError> {
    for _ in 0..ITERATIONS {
        for direction in [Direction::Backward, Direction::Forward] {
            motors.set(MotorSlot::M1, direction, SPEED)?;
            motors.set(MotorSlot::M2, direction, SPEED)?;
            info!("{:?}", direction);

            if !sleep_while_running(running, HOLD) {
                return Ok(());
            }
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    SimpleLogger::new().with_level(LevelFilter::Info).env().init()?;
    let running = install_handler()?;

    let config = HatConfig::load()?;
    let context = Pca9685Context::new(&config);
    let mut motors = Motors::setup(&context, MOTOR_FREQUENCY)?;
    if let Some(address) = context.get_active_address() {
        info!("Using PCA9685 at 0x{:02X}", address);
    }

    let result = run(&mut motors, &running);
    motors.destroy(&context);
    result?;
    Ok(())
}
