use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use log::warn;
use serde::{Serialize, Deserialize};
use crate::bus::BusBackend;

pub const ENV_PCA9685_ADDRS: &str = "ADEEPT_PCA9685_ADDRS";
pub const ENV_BATTERY_ADDR: &str = "ADEEPT_BAT_ADDR";
pub const ENV_I2C_BUS: &str = "ADEEPT_I2C_BUS";
pub const ENV_I2C_BACKEND: &str = "ADEEPT_I2C_BACKEND";
pub const ENV_CONFIG_PATH: &str = "ADEEPT_HAT_CONFIG";

// Adeept firmware default first, then the PCA9685 power-on default.
pub const DEFAULT_PCA9685_ADDRS: [u8; 2] = [0x5F, 0x40];
pub const DEFAULT_BATTERY_ADDRS: [u8; 4] = [0x48, 0x49, 0x4A, 0x4B];
pub const DEFAULT_I2C_BUS: u8 = 1;

const MAX_7BIT_ADDRESS: u16 = 0x7F;

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    SerializeError(String),
    InvalidEntry(String),
    MissingEntry(String),
    DuplicateEntry(String),
    Other(String)
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            ConfigError::SerializeError(msg) => format!("serialize/parse error: {}", msg),
            ConfigError::InvalidEntry(msg) => format!("invalid config entry: {}", msg),
            ConfigError::MissingEntry(msg) => format!("missing config entry: {}", msg),
            ConfigError::DuplicateEntry(msg) => format!("duplicate config entry: {}", msg),
            ConfigError::Other(msg) => format!("config error: {}", msg)
        })
    }
}

impl std::error::Error for ConfigError {}

/// Parses a single hexadecimal bus address, with or without a `0x` prefix.
pub fn parse_address(item: &str) -> Result<u8, ConfigError> {
    let item = item.trim();
    let digits = item.strip_prefix("0x")
        .or_else(|| item.strip_prefix("0X"))
        .unwrap_or(item);

    let value = u16::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidEntry(
        format!("unable to parse I2C address {:?}", item)
    ))?;

    if value > MAX_7BIT_ADDRESS {
        return Err(ConfigError::InvalidEntry(
            format!("I2C address {:?} is outside the 7-bit range", item)
        ));
    }

    Ok(value as u8)
}

/// Parses a comma separated list of hexadecimal addresses.
///
/// An unset or blank value, or one with no entries at all, yields the PCA9685 defaults.
/// Any malformed entry is an error.
pub fn parse_address_list(value: Option<&str>) -> Result<Vec<u8>, ConfigError> {
    let value = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Ok(DEFAULT_PCA9685_ADDRS.to_vec())
    };

    let mut parsed = Vec::new();
    for item in value.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let address = parse_address(item).map_err(|_| ConfigError::InvalidEntry(
            format!("unable to parse {} entry {:?}", ENV_PCA9685_ADDRS, item)
        ))?;
        parsed.push(address);
    }

    if parsed.is_empty() {
        return Ok(DEFAULT_PCA9685_ADDRS.to_vec());
    }

    Ok(parsed)
}

/// Resolves the ADS7830 probe list. A bad override is reported and ignored.
pub fn parse_battery_addresses(value: Option<&str>) -> Vec<u8> {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        match parse_address(v) {
            Ok(address) => return vec![address],
            Err(e) => warn!("Invalid {} {:?} ({}), falling back to defaults", ENV_BATTERY_ADDR, v, e)
        }
    }

    DEFAULT_BATTERY_ADDRS.to_vec()
}

fn validate_addresses(name: &str, addresses: &[u8]) -> Result<(), ConfigError> {
    if addresses.is_empty() {
        return Err(ConfigError::MissingEntry(format!("{} must list at least one address", name)));
    }

    let mut seen = Vec::new();
    for address in addresses {
        if *address as u16 > MAX_7BIT_ADDRESS {
            return Err(ConfigError::InvalidEntry(
                format!("{} contains 0x{:02X}, which is outside the 7-bit range", name, address)
            ));
        }

        if seen.contains(address) {
            return Err(ConfigError::DuplicateEntry(
                format!("{} lists 0x{:02X} more than once", name, address)
            ));
        }

        seen.push(*address);
    }

    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HatConfig {
    pub bus_id: u8,
    pub backend: BusBackend,
    pub pca9685_addresses: Vec<u8>,
    pub battery_addresses: Vec<u8>
}

impl Default for HatConfig {
    fn default() -> Self {
        HatConfig {
            bus_id: DEFAULT_I2C_BUS,
            backend: BusBackend::default(),
            pca9685_addresses: DEFAULT_PCA9685_ADDRS.to_vec(),
            battery_addresses: DEFAULT_BATTERY_ADDRS.to_vec()
        }
    }
}

impl HatConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_addresses("pca9685_addresses", &self.pca9685_addresses)?;
        validate_addresses("battery_addresses", &self.battery_addresses)?;
        Ok(())
    }

    /// Resolves the configuration from a variable lookup, normally the process environment.
    pub fn from_vars<F>(lookup: F) -> Result<HatConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>
    {
        let bus_id = match lookup(ENV_I2C_BUS) {
            Some(v) if !v.trim().is_empty() => v.trim().parse::<u8>().map_err(|_| ConfigError::InvalidEntry(
                format!("unable to parse {} value {:?}", ENV_I2C_BUS, v)
            ))?,
            _ => DEFAULT_I2C_BUS
        };

        let backend = match lookup(ENV_I2C_BACKEND) {
            Some(v) if !v.trim().is_empty() => BusBackend::from_name(&v).ok_or_else(|| ConfigError::InvalidEntry(
                format!("unknown {} value {:?}, expected sysfs or rppal", ENV_I2C_BACKEND, v)
            ))?,
            _ => BusBackend::default()
        };

        let config = HatConfig {
            bus_id,
            backend,
            pca9685_addresses: parse_address_list(lookup(ENV_PCA9685_ADDRS).as_deref())?,
            battery_addresses: parse_battery_addresses(lookup(ENV_BATTERY_ADDR).as_deref())
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<HatConfig, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Loads the file named by `ADEEPT_HAT_CONFIG` if set, otherwise reads the environment.
    pub fn load() -> Result<HatConfig, ConfigError> {
        match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) if !path.trim().is_empty() => {
                let file = File::open(&path).map_err(|e| ConfigError::Other(
                    format!("failed to open config file {}: {}", path, e)
                ))?;
                Self::from_reader(file)
            }
            _ => Self::from_env()
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<HatConfig, ConfigError> {
        let config: HatConfig = match serde_json::from_reader(reader) {
            Ok(c) => c,
            Err(e) => {
                return Err(ConfigError::SerializeError(
                    format!("failed to deserialize config file: {}", e)
                ));
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_str(json_str: &str) -> Result<HatConfig, ConfigError> {
        Self::from_reader(json_str.as_bytes())
    }

    pub fn to_str(&self, pretty: bool) -> Result<String, ConfigError> {
        let result = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };

        result.map_err(|e| ConfigError::SerializeError(
            format!("failed to serialize config: {}", e)
        ))
    }
}
