//! Shared access to the HAT's PCA9685.
//!
//! The chip may answer at the Adeept firmware address (0x5F) or at the PCA9685 power-on default
//! (0x40) depending on how the board was assembled. [`Pca9685Context`] probes the candidate
//! addresses once, then hands the same controller to every caller until [`Pca9685Context::deinit`].

use crate::bus::{self, BusOpener, I2CError, SharedBus};
use crate::config::{HatConfig, DEFAULT_PCA9685_ADDRS};
use crate::drivers::pca9685::{Pca9685, Pca9685Error, SharedPca9685};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

const NO_ADDRESS: u16 = u16::MAX;

#[derive(Debug, PartialEq, Clone)]
pub enum HatError {
    Bus(I2CError),
    ChipNotFound {
        addresses: Vec<u8>,
        source: Option<Pca9685Error>
    },
    Controller(Pca9685Error)
}

fn format_addresses(addresses: &[u8]) -> String {
    addresses.iter().map(|a| format!("0x{:02X}", a)).collect::<Vec<_>>().join(", ")
}

impl Display for HatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            HatError::Bus(e) => format!("failed to open I2C bus: {}", e),
            HatError::ChipNotFound { addresses, .. } => format!(
                "unable to communicate with PCA9685 at addresses: {}", format_addresses(addresses)
            ),
            HatError::Controller(e) => format!("PCA9685 error: {}", e),
        })
    }
}

impl std::error::Error for HatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HatError::Bus(e) => Some(e),
            HatError::ChipNotFound { source: Some(e), .. } => Some(e),
            HatError::ChipNotFound { source: None, .. } => None,
            HatError::Controller(e) => Some(e),
        }
    }
}

struct ContextState {
    bus: Option<SharedBus>,
    controller: Option<SharedPca9685>,
    probed_addresses: Vec<u8>
}

pub struct Pca9685Context {
    opener: BusOpener,
    default_addresses: Vec<u8>,
    state: Mutex<ContextState>,
    active_address: AtomicU16
}

impl Pca9685Context {
    pub fn new(config: &HatConfig) -> Self {
        let backend = config.backend;
        let bus_id = config.bus_id;
        Self::with_bus_opener(
            Box::new(move || bus::open(backend, bus_id)),
            config.pca9685_addresses.clone()
        )
    }

    pub fn with_bus_opener(opener: BusOpener, default_addresses: Vec<u8>) -> Self {
        let default_addresses = if default_addresses.is_empty() {
            DEFAULT_PCA9685_ADDRS.to_vec()
        } else {
            default_addresses
        };

        Pca9685Context {
            opener,
            default_addresses,
            state: Mutex::new(ContextState {
                bus: None,
                controller: None,
                probed_addresses: Vec::new()
            }),
            active_address: AtomicU16::new(NO_ADDRESS)
        }
    }

    /// Returns the shared controller, probing for it on first use.
    ///
    /// `addresses` overrides the configured probe order but is ignored once a controller is
    /// cached. A non-zero `frequency` is applied to the cached controller if it differs.
    pub fn get_pca9685(&self, frequency: u16, addresses: Option<&[u8]>) -> Result<SharedPca9685, HatError> {
        let mut state = self.state.lock();

        if let Some(controller) = &state.controller {
            if let Some(requested) = addresses.filter(|a| !a.is_empty()) {
                if requested != state.probed_addresses.as_slice() {
                    debug!(
                        "PCA9685 already bound to 0x{:02X}, ignoring requested addresses [{}]",
                        self.active_address.load(Ordering::Acquire), format_addresses(requested)
                    );
                }
            }

            let mut guard = controller.lock();
            if frequency != 0 && guard.frequency() != Some(frequency) {
                guard.set_frequency(frequency).map_err(HatError::Controller)?;
            }
            drop(guard);

            return Ok(controller.clone());
        }

        let candidates = match addresses {
            Some(a) if !a.is_empty() => a.to_vec(),
            _ => self.default_addresses.clone()
        };

        let bus = match &state.bus {
            Some(bus) => bus.clone(),
            None => {
                let bus = (self.opener)().map_err(HatError::Bus)?;
                debug!("Probing for PCA9685 on {}", bus.lock().name());
                state.bus = Some(bus.clone());
                bus
            }
        };

        let mut last_error = None;
        for &address in &candidates {
            match Self::try_address(&bus, address, frequency) {
                Ok(controller) => {
                    info!("PCA9685 found at 0x{:02X}", address);
                    let controller = Arc::new(Mutex::new(controller));
                    state.controller = Some(controller.clone());
                    state.probed_addresses = candidates.clone();
                    self.active_address.store(address as u16, Ordering::Release);
                    return Ok(controller);
                }
                Err(e) => {
                    debug!("No usable PCA9685 at 0x{:02X}: {}", address, e);
                    last_error = Some(e);
                }
            }
        }

        Err(HatError::ChipNotFound { addresses: candidates, source: last_error })
    }

    fn try_address(bus: &SharedBus, address: u8, frequency: u16) -> Result<Pca9685, Pca9685Error> {
        let mut controller = Pca9685::new(bus.clone(), address)?;
        if frequency != 0 {
            controller.set_frequency(frequency)?;
        }

        Ok(controller)
    }

    /// Address the cached controller was found at, for diagnostics.
    pub fn get_active_address(&self) -> Option<u8> {
        match self.active_address.load(Ordering::Acquire) {
            NO_ADDRESS => None,
            address => Some(address as u8)
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().controller.is_some()
    }

    /// Powers the controller down and forgets it. The bus stays open for the next probe.
    pub fn deinit(&self) {
        let mut state = self.state.lock();
        if let Some(controller) = state.controller.take() {
            if let Err(e) = controller.lock().deinit() {
                warn!("Failed to power down PCA9685: {}", e);
            }
        }

        state.probed_addresses.clear();
        self.active_address.store(NO_ADDRESS, Ordering::Release);
    }
}
