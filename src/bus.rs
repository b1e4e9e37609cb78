use std::fmt::Display;
use std::sync::Arc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Byte-level access to an I2C bus. Every call addresses a 7-bit slave.
pub trait I2cTransport: Send {
    fn name(&self) -> String;
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), I2CError>;
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), I2CError>;

    fn write_read(&mut self, address: u8, bytes: &[u8], buf: &mut [u8]) -> Result<(), I2CError> {
        self.write(address, bytes)?;
        self.read(address, buf)
    }
}

pub type SharedBus = Arc<Mutex<dyn I2cTransport>>;

/// Opens the bus on demand. Called at most once per context.
pub type BusOpener = Box<dyn Fn() -> Result<SharedBus, I2CError> + Send + Sync>;

#[derive(Debug, PartialEq, Clone)]
pub enum I2CError {
    InvalidConfig(String),
    BusNotFound(u8),
    InvalidAddress(u16),
    NotSupported,
    HardwareError(String),
    OsError(String),
    Other(String)
}

impl Display for I2CError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            I2CError::InvalidConfig(msg) => format!("invalid config: {}", msg),
            I2CError::BusNotFound(bus_id) => format!("I2C bus {} does not exist", bus_id),
            I2CError::InvalidAddress(device_address) => format!("invalid slave address: 0x{:02X}", device_address),
            I2CError::NotSupported => format!("not supported"),
            I2CError::HardwareError(msg) => format!("hardware error: {}", msg),
            I2CError::OsError(msg) => format!("OS error: {}", msg),
            I2CError::Other(msg) => format!("{}", msg),
        })
    }
}

impl std::error::Error for I2CError {}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusBackend {
    #[default]
    Sysfs,
    Rppal
}

impl BusBackend {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sysfs" => Some(BusBackend::Sysfs),
            "rppal" => Some(BusBackend::Rppal),
            _ => None
        }
    }
}

pub fn open(backend: BusBackend, bus_id: u8) -> Result<SharedBus, I2CError> {
    let bus: SharedBus = match backend {
        BusBackend::Sysfs => Arc::new(Mutex::new(i2c_sysfs::SysfsI2cBus::open(bus_id)?)),
        BusBackend::Rppal => Arc::new(Mutex::new(i2c::RppalI2cBus::open(bus_id)?)),
    };

    Ok(bus)
}

// helper methods for interfacing with register based devices
pub fn write_register(bus: &mut dyn I2cTransport, address: u8, register: u8, data: u8) -> Result<(), I2CError> {
    bus.write(address, &[register, data])
}

pub fn read_register(bus: &mut dyn I2cTransport, address: u8, register: u8, buf: &mut [u8]) -> Result<(), I2CError> {
    bus.write_read(address, &[register], buf)
}

pub fn read_register_u8(bus: &mut dyn I2cTransport, address: u8, register: u8) -> Result<u8, I2CError> {
    let mut buf = [0u8; 1];
    read_register(bus, address, register, &mut buf)?;
    Ok(buf[0])
}

// Bus implementations
pub mod i2c; // RppalI2cBus
pub mod i2c_sysfs; // SysfsI2cBus
