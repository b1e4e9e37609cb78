use super::{I2CError, I2cTransport};
use log::debug;
use rppal::i2c::{Error, I2c};

fn rppal_map_err(err: Error, default_err_msg: &str) -> I2CError {
    match err {
        Error::Io(e) => I2CError::HardwareError(format!("I/O error: {}", e)),
        Error::InvalidSlaveAddress(addr) => I2CError::InvalidAddress(addr),
        Error::FeatureNotSupported => I2CError::NotSupported,
        _ => I2CError::Other(default_err_msg.to_string())
    }
}

/// I2C bus driven through rppal, Raspberry Pi only.
pub struct RppalI2cBus {
    bus_id: u8,
    bus: I2c,
    slave_address: Option<u8>
}

impl RppalI2cBus {
    pub fn open(bus_id: u8) -> Result<Self, I2CError> {
        let bus = I2c::with_bus(bus_id)
            .map_err(|err| rppal_map_err(err, &format!("Internal RPPAL error while opening I2C bus {}", bus_id)))?;

        debug!("Opened I2C bus {} through rppal", bus_id);
        Ok(RppalI2cBus { bus_id, bus, slave_address: None })
    }

    fn select(&mut self, address: u8) -> Result<(), I2CError> {
        if self.slave_address == Some(address) {
            return Ok(());
        }

        self.bus.set_slave_address(address as u16)
            .map_err(|err| rppal_map_err(err, &format!("failed to select slave 0x{:02X} on bus {}", address, self.bus_id)))?;
        self.slave_address = Some(address);
        Ok(())
    }
}

impl I2cTransport for RppalI2cBus {
    fn name(&self) -> String {
        format!("rppal:i2c-{}", self.bus_id)
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), I2CError> {
        self.select(address)?;
        let written = self.bus.write(bytes)
            .map_err(|err| rppal_map_err(err, &format!("write to 0x{:02X} failed", address)))?;

        if written != bytes.len() {
            return Err(I2CError::HardwareError(format!(
                "short write to 0x{:02X}: {} of {} bytes", address, written, bytes.len()
            )));
        }

        Ok(())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), I2CError> {
        self.select(address)?;
        let read = self.bus.read(buf)
            .map_err(|err| rppal_map_err(err, &format!("read from 0x{:02X} failed", address)))?;

        if read != buf.len() {
            return Err(I2CError::HardwareError(format!(
                "short read from 0x{:02X}: {} of {} bytes", address, read, buf.len()
            )));
        }

        Ok(())
    }

    fn write_read(&mut self, address: u8, bytes: &[u8], buf: &mut [u8]) -> Result<(), I2CError> {
        self.select(address)?;
        self.bus.write_read(bytes, buf)
            .map_err(|err| rppal_map_err(err, &format!("write/read with 0x{:02X} failed", address)))
    }
}
