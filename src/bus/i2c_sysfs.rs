use super::{I2CError, I2cTransport};
use i2c_linux::I2c;
use log::debug;
use std::{fs::File, io::{Read, Write}, path::Path};

const I2C_CLASS_PATH: &str = "/sys/class/i2c-dev";
const I2C_DEVICE_PATH: &str = "/dev";

fn sysfs_map_err(err: std::io::Error, default_err_msg: &str) -> I2CError {
    I2CError::HardwareError(format!("{}: {}", default_err_msg, err))
}

/// I2C bus driven through the kernel's i2c-dev interface.
pub struct SysfsI2cBus {
    bus_id: u8,
    bus: I2c<File>,
    slave_address: Option<u8>
}

impl SysfsI2cBus {
    pub fn open(bus_id: u8) -> Result<Self, I2CError> {
        let path = Path::new(I2C_CLASS_PATH);
        if !path.exists() || !path.is_dir() {
            return Err(I2CError::OsError(
                "I2C is not supported on this system".to_string(),
            ));
        }

        let device_path = Path::new(I2C_DEVICE_PATH).join(format!("i2c-{}", bus_id));
        if !device_path.exists() {
            return Err(I2CError::BusNotFound(bus_id));
        }

        let bus = I2c::from_path(device_path)
            .map_err(|err| sysfs_map_err(err, &format!("Internal sysfs error while opening I2C bus {}", bus_id)))?;

        debug!("Opened I2C bus {} through i2c-dev", bus_id);
        Ok(SysfsI2cBus { bus_id, bus, slave_address: None })
    }

    fn select(&mut self, address: u8) -> Result<(), I2CError> {
        if self.slave_address == Some(address) {
            return Ok(());
        }

        self.bus.smbus_set_slave_address(address as u16, false)
            .map_err(|err| sysfs_map_err(err, &format!("failed to select slave 0x{:02X} on bus {}", address, self.bus_id)))?;
        self.slave_address = Some(address);
        Ok(())
    }
}

impl I2cTransport for SysfsI2cBus {
    fn name(&self) -> String {
        format!("i2c-{}", self.bus_id)
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), I2CError> {
        self.select(address)?;
        self.bus.write_all(bytes)
            .map_err(|err| sysfs_map_err(err, &format!("write to 0x{:02X} failed", address)))
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), I2CError> {
        self.select(address)?;
        self.bus.read_exact(buf)
            .map_err(|err| sysfs_map_err(err, &format!("read from 0x{:02X} failed", address)))
    }
}
